//! Session lifecycle for the merchant dashboard.
//!
//! This crate provides:
//! - Advisory access token expiry inspection (no signature verification)
//! - Token refresh against the auth service, clearing the session on failure
//! - A background refresh scheduler with at most one polling task
//! - Phone + one-time-code login with an FSM-tracked flow and resend cooldown

mod error;
mod http;
mod otp_code;
mod otp_flow;
mod otp_fsm;
mod refresh_client;
mod refresh_scheduler;
mod resend_cooldown;
mod session;
mod session_exchange;
pub mod token_inspector;

#[cfg(test)]
mod tests;

pub use error::{
    DecodeError, ExchangeError, OtpError, OtpResult, OtpValidationError, RefreshError,
    RefreshResult,
};
pub use otp_code::{OtpCode, OTP_LENGTH};
pub use otp_flow::OtpFlow;
pub use otp_fsm::otp_machine;
pub use otp_fsm::{OtpMachine, OtpMachineInput, OtpMachineState, OtpState};
pub use refresh_client::{
    HttpRefreshBackend, RefreshBackend, RefreshClient, RefreshResponse, REFRESH_PATH,
};
pub use refresh_scheduler::{
    PollStrategy, RefreshScheduler, SchedulerConfig, SessionEvent, TickOutcome,
    DEFAULT_POLL_INTERVAL, MIN_TICK_DELAY,
};
pub use resend_cooldown::{ResendCooldown, DEFAULT_RESEND_COOLDOWN};
pub use session::{SessionKeeper, SessionStatus};
pub use session_exchange::{HttpSessionExchange, SessionExchange, SEND_OTP_PATH, VERIFY_OTP_PATH};
pub use token_inspector::{Claims, DEFAULT_EXPIRY_HORIZON};
