//! OTP login flow.

use super::harness::{fresh_token, FakeExchange, Harness};
use crate::{OtpError, OtpFlow, OtpState, OtpValidationError, SchedulerConfig, TickOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use token_vault::{TokenPair, TokenStore};

const PHONE: &str = "+15550100";

async fn start_flow(exchange: &Arc<FakeExchange>, store: &Arc<TokenStore>) -> OtpFlow {
    OtpFlow::start(PHONE, exchange.clone(), store.clone(), Duration::from_secs(30))
        .await
        .unwrap()
}

fn type_slots(flow: &mut OtpFlow, slots: [&str; 6]) {
    for (i, s) in slots.iter().enumerate() {
        if let Some(ch) = s.chars().next() {
            flow.input(i, ch).unwrap();
        }
    }
}

#[tokio::test(start_paused = true)]
async fn start_requests_first_code() {
    let exchange = Arc::new(FakeExchange::new());
    let store = Arc::new(TokenStore::in_memory());

    let flow = OtpFlow::start("  +15550100 ", exchange.clone(), store, Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(flow.phone_number(), PHONE);
    assert_eq!(flow.state(), OtpState::Entering);
    assert_eq!(*exchange.code_requests.lock().unwrap(), vec![PHONE.to_string()]);
    assert_eq!(flow.resend_remaining_secs(), 30);
}

#[tokio::test(start_paused = true)]
async fn blank_phone_is_rejected_locally() {
    let exchange = Arc::new(FakeExchange::new());

    let result = OtpFlow::start(" ", exchange.clone(), Arc::new(TokenStore::in_memory()), Duration::from_secs(30)).await;

    assert!(matches!(
        result,
        Err(OtpError::Validation(OtpValidationError::MissingPhoneNumber))
    ));
    assert_eq!(exchange.code_request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_code_request_fails_start() {
    let exchange = Arc::new(FakeExchange::new());
    exchange.fail_code_requests(true);

    let result = OtpFlow::start(PHONE, exchange.clone(), Arc::new(TokenStore::in_memory()), Duration::from_secs(30)).await;

    assert!(matches!(result, Err(OtpError::Resend(_))));
}

#[tokio::test(start_paused = true)]
async fn incomplete_code_never_reaches_server() {
    let exchange = Arc::new(FakeExchange::new());
    let store = Arc::new(TokenStore::in_memory());
    let mut flow = start_flow(&exchange, &store).await;
    type_slots(&mut flow, ["1", "2", "3", "", "5", "6"]);

    let err = flow.submit().await.unwrap_err();

    assert!(matches!(
        err,
        OtpError::Validation(OtpValidationError::Incomplete { ref missing }) if missing == &vec![3]
    ));
    assert_eq!(exchange.verification_count(), 0);
    assert_eq!(flow.state(), OtpState::Entering);
    assert_eq!(flow.last_error(), Some("Please enter all 6 digits"));
}

#[tokio::test(start_paused = true)]
async fn complete_code_is_verified_once_and_stored() {
    let exchange = Arc::new(FakeExchange::new());
    exchange.accept_with(TokenPair::new("A1", "R1"));
    let store = Arc::new(TokenStore::in_memory());
    let mut flow = start_flow(&exchange, &store).await;
    type_slots(&mut flow, ["1", "2", "3", "4", "5", "6"]);

    let pair = flow.submit().await.unwrap();

    assert_eq!(pair, TokenPair::new("A1", "R1"));
    assert_eq!(
        *exchange.verifications.lock().unwrap(),
        vec![(PHONE.to_string(), "123456".to_string())]
    );
    assert_eq!(flow.state(), OtpState::Success);
    assert_eq!(store.pair().unwrap(), Some(TokenPair::new("A1", "R1")));
}

#[tokio::test(start_paused = true)]
async fn rejected_code_returns_to_entering_with_digits() {
    let exchange = Arc::new(FakeExchange::new());
    exchange.reject_with(401);
    exchange.accept_with(TokenPair::new("A1", "R1"));
    let store = Arc::new(TokenStore::in_memory());
    let mut flow = start_flow(&exchange, &store).await;
    flow.fill("123456").unwrap();

    let err = flow.submit().await.unwrap_err();

    assert!(matches!(err, OtpError::Auth(_)));
    assert_eq!(flow.state(), OtpState::Entering);
    assert_eq!(flow.code().value().as_deref(), Some("123456"));
    assert!(flow.last_error().is_some());
    assert!(!store.has_session().unwrap());

    // Correct one digit and try again.
    flow.backspace(5).unwrap();
    flow.input(5, '7').unwrap();
    flow.submit().await.unwrap();

    assert_eq!(flow.state(), OtpState::Success);
    assert_eq!(exchange.verifications.lock().unwrap()[1].1, "123457");
    assert_eq!(flow.last_error(), None);
}

#[tokio::test(start_paused = true)]
async fn finished_flow_accepts_no_more_input() {
    let exchange = Arc::new(FakeExchange::new());
    exchange.accept_with(TokenPair::new("A1", "R1"));
    let store = Arc::new(TokenStore::in_memory());
    let mut flow = start_flow(&exchange, &store).await;
    flow.fill("123456").unwrap();
    flow.submit().await.unwrap();

    assert!(matches!(flow.input(0, '1'), Err(OtpError::InvalidState(_))));
    assert!(matches!(flow.submit().await, Err(OtpError::InvalidState(_))));
    assert!(matches!(flow.resend().await, Err(OtpError::InvalidState(_))));
    assert_eq!(exchange.verification_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn resend_is_gated_by_cooldown() {
    let exchange = Arc::new(FakeExchange::new());
    let store = Arc::new(TokenStore::in_memory());
    let mut flow = start_flow(&exchange, &store).await;
    flow.fill("12").unwrap();

    let err = flow.resend().await.unwrap_err();
    assert!(matches!(err, OtpError::ResendCooldown { remaining_secs: 30 }));
    assert_eq!(exchange.code_request_count(), 1);
    assert_eq!(flow.code().to_string(), "12____");

    for _ in 0..29 {
        time::advance(Duration::from_secs(1)).await;
    }
    assert!(!flow.can_resend());
    assert!(matches!(
        flow.resend().await,
        Err(OtpError::ResendCooldown { remaining_secs: 1 })
    ));

    time::advance(Duration::from_secs(1)).await;
    assert!(flow.can_resend());
    flow.resend().await.unwrap();

    assert_eq!(exchange.code_request_count(), 2);
    assert_eq!(flow.code().to_string(), "______");
    assert_eq!(flow.code().focus(), 0);
    assert_eq!(flow.resend_remaining_secs(), 30);
    assert!(!flow.can_resend());
}

#[tokio::test(start_paused = true)]
async fn failed_resend_keeps_digits() {
    let exchange = Arc::new(FakeExchange::new());
    let store = Arc::new(TokenStore::in_memory());
    let mut flow = start_flow(&exchange, &store).await;
    flow.fill("123").unwrap();
    time::advance(Duration::from_secs(30)).await;

    exchange.fail_code_requests(true);
    assert!(matches!(flow.resend().await, Err(OtpError::Resend(_))));

    assert_eq!(flow.code().to_string(), "123___");
    assert!(flow.can_resend());
}

#[tokio::test(start_paused = true)]
async fn login_feeds_background_refresh() {
    let harness = Harness::new();
    let keeper = harness.keeper();
    let exchange = Arc::new(FakeExchange::new());
    exchange.accept_with(TokenPair::new(fresh_token(), "R1"));

    let mut flow = keeper.begin_login(PHONE, exchange.clone()).await.unwrap();
    flow.fill("654321").unwrap();
    flow.submit().await.unwrap();

    assert!(keeper.status().unwrap().logged_in);
    assert_eq!(keeper.start().await, TickOutcome::Fresh);
    assert!(keeper.is_running());
    assert_eq!(keeper.scheduler_config(), &SchedulerConfig::default());
}
