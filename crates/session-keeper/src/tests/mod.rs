//! Scenario tests for session-keeper.
//!
//! - `harness.rs`      - fake refresh backend, fake session exchange, token minting
//! - `refresh_flow.rs` - refresh client against the token store
//! - `scheduler.rs`    - background refresh timing, restart, stop and self-termination
//! - `otp.rs`          - OTP entry, submission and resend cooldown

mod otp;
mod scheduler;
