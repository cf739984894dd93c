//! Background refresh scheduling.
//!
//! All tests run on tokio's paused clock: sleeping in the test advances
//! virtual time and fires the scheduler's timers in order. Token expiry is
//! judged against the wall clock, which does not move.

use super::harness::{fresh_token, one_tick, token_expiring_in, BackendReply, FakeRefreshBackend, Harness};
use crate::{PollStrategy, SchedulerConfig, SessionEvent, TickOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use token_vault::TokenPair;

#[tokio::test(start_paused = true)]
async fn expiring_token_is_refreshed_on_start() {
    let harness = Harness::new().logged_in(&token_expiring_in(600), "R1");
    harness.backend.push_reply(BackendReply::access("A2"));
    let scheduler = harness.scheduler();
    let mut events = scheduler.subscribe();

    let outcome = scheduler.start(SchedulerConfig::default()).await;

    assert_eq!(outcome, TickOutcome::Refreshed);
    assert_eq!(harness.backend.calls(), 1);
    assert_eq!(harness.store.pair().unwrap(), Some(TokenPair::new("A2", "R1")));
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Refreshed { expires_at: None }
    );
    assert!(scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn fresh_token_is_left_alone() {
    let harness = Harness::new().logged_in(&fresh_token(), "R1");
    let scheduler = harness.scheduler();

    assert_eq!(scheduler.start(SchedulerConfig::default()).await, TickOutcome::Fresh);
    sleep(one_tick() * 3).await;

    assert_eq!(harness.backend.calls(), 0);
    assert!(scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn restart_leaves_a_single_task() {
    let harness = Harness::new().logged_in(&token_expiring_in(600), "R1");
    // Every refresh hands back another short-lived token, so every tick refreshes.
    harness
        .backend
        .set_default_reply(BackendReply::access(token_expiring_in(600)));
    let scheduler = harness.scheduler();

    scheduler.start(SchedulerConfig::default()).await;
    scheduler.start(SchedulerConfig::default()).await;
    assert_eq!(harness.backend.calls(), 2);

    sleep(one_tick()).await;
    assert_eq!(harness.backend.calls(), 3);

    sleep(one_tick()).await;
    assert_eq!(harness.backend.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn zero_adaptive_delay_still_lets_time_pass() {
    let harness = Harness::new().logged_in(&token_expiring_in(60), "R1");
    harness
        .backend
        .set_default_reply(BackendReply::access(token_expiring_in(60)));
    let scheduler = harness.scheduler();
    let config = SchedulerConfig {
        strategy: PollStrategy::Adaptive {
            min_delay: Duration::ZERO,
        },
        ..SchedulerConfig::default()
    };

    scheduler.start(config).await;
    sleep(Duration::from_millis(10_500)).await;

    // One refresh on start, then at most one per second.
    let calls = harness.backend.calls();
    assert!((2..=11).contains(&calls), "calls = {calls}");
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn stop_without_task_is_a_noop() {
    let harness = Harness::new();
    let scheduler = harness.scheduler();

    scheduler.stop();
    scheduler.stop();

    assert!(!scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_future_ticks() {
    let harness = Harness::new().logged_in(&token_expiring_in(600), "R1");
    harness
        .backend
        .set_default_reply(BackendReply::access(token_expiring_in(600)));
    let scheduler = harness.scheduler();

    scheduler.start(SchedulerConfig::default()).await;
    scheduler.stop();
    scheduler.stop();
    sleep(one_tick() * 2).await;

    assert_eq!(harness.backend.calls(), 1);
    assert!(!scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn scheduler_stops_itself_when_token_disappears() {
    let harness = Harness::new().logged_in(&fresh_token(), "R1");
    let scheduler = harness.scheduler();
    let mut events = scheduler.subscribe();

    scheduler.start(SchedulerConfig::default()).await;
    assert!(scheduler.is_running());

    harness.store.clear().unwrap();
    sleep(one_tick()).await;

    assert!(!scheduler.is_running());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SessionEnded);
    assert_eq!(harness.backend.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn start_without_session_arms_nothing() {
    let harness = Harness::new();
    let scheduler = harness.scheduler();

    assert_eq!(scheduler.start(SchedulerConfig::default()).await, TickOutcome::NoSession);
    assert!(!scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_forces_login() {
    let harness = Harness::new().logged_in(&token_expiring_in(600), "R1");
    harness.backend.push_reply(BackendReply::Reject(401));
    let scheduler = harness.scheduler();
    let mut events = scheduler.subscribe();

    let outcome = scheduler.start(SchedulerConfig::default()).await;

    assert!(matches!(outcome, TickOutcome::LoginRequired(_)));
    assert!(!scheduler.is_running());
    assert!(!harness.store.has_session().unwrap());
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::LoginRequired { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn background_failure_clears_session_and_exits() {
    let harness = Harness::new().logged_in(&fresh_token(), "R1");
    harness.backend.push_reply(BackendReply::Reject(403));
    let scheduler = harness.scheduler();

    assert_eq!(scheduler.start(SchedulerConfig::default()).await, TickOutcome::Fresh);
    let mut events = scheduler.subscribe();

    // The token is about to expire by the next tick.
    harness.store.apply_refresh(&token_expiring_in(60), None).unwrap();
    sleep(one_tick()).await;

    assert_eq!(harness.backend.calls(), 1);
    assert_eq!(harness.store.access_token().unwrap(), None);
    assert_eq!(harness.store.refresh_token().unwrap(), None);
    assert!(!scheduler.is_running());
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::LoginRequired { .. }
    ));

    sleep(one_tick() * 2).await;
    assert_eq!(harness.backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_refresh_token_stops_quietly() {
    let harness = Harness::new();
    let access = token_expiring_in(600);
    harness.store.apply_refresh(&access, None).unwrap();
    let scheduler = harness.scheduler();
    let mut events = scheduler.subscribe();

    let outcome = scheduler.start(SchedulerConfig::default()).await;

    assert!(matches!(outcome, TickOutcome::Stopped(_)));
    assert_eq!(harness.backend.calls(), 0);
    assert!(!scheduler.is_running());
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(harness.store.access_token().unwrap(), Some(access));
}

#[tokio::test(start_paused = true)]
async fn refresh_token_lost_mid_session_stops_quietly() {
    let harness = Harness::new().logged_in(&fresh_token(), "R1");
    let scheduler = harness.scheduler();
    let mut events = scheduler.subscribe();
    scheduler.start(SchedulerConfig::default()).await;

    // Another writer leaves an expiring access token and no refresh token.
    harness.store.clear().unwrap();
    harness.store.apply_refresh(&token_expiring_in(60), None).unwrap();
    sleep(one_tick()).await;

    assert!(!scheduler.is_running());
    assert_eq!(harness.backend.calls(), 0);
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert!(harness.store.has_session().unwrap());
}

#[tokio::test(start_paused = true)]
async fn in_flight_tick_completes_after_stop() {
    let gate = Arc::new(Semaphore::new(0));
    let harness =
        Harness::with_backend(FakeRefreshBackend::gated(gate.clone())).logged_in(&fresh_token(), "R1");
    harness.backend.push_reply(BackendReply::access("A2"));
    let scheduler = harness.scheduler();

    scheduler.start(SchedulerConfig::default()).await;
    harness.store.apply_refresh(&token_expiring_in(60), None).unwrap();

    // The background tick is now waiting on the backend.
    sleep(one_tick()).await;
    assert_eq!(harness.backend.calls(), 1);

    scheduler.stop();
    gate.add_permits(1);
    sleep(Duration::from_secs(1)).await;

    assert_eq!(harness.store.pair().unwrap(), Some(TokenPair::new("A2", "R1")));
    assert!(!scheduler.is_running());

    sleep(one_tick() * 2).await;
    assert_eq!(harness.backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_scheduler_stops_task() {
    let harness = Harness::new().logged_in(&token_expiring_in(600), "R1");
    harness
        .backend
        .set_default_reply(BackendReply::access(token_expiring_in(600)));

    {
        let scheduler = harness.scheduler();
        scheduler.start(SchedulerConfig::default()).await;
    }
    sleep(one_tick() * 2).await;

    assert_eq!(harness.backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn keeper_logout_stops_refresh() {
    let harness = Harness::new().logged_in(&fresh_token(), "R1");
    let keeper = harness.keeper();

    keeper.start().await;
    assert!(keeper.is_running());

    keeper.logout().unwrap();

    assert!(!keeper.is_running());
    assert!(!keeper.status().unwrap().logged_in);
}
