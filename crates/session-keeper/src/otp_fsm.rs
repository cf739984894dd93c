//! One-time-password login state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │    Entering     │ (initial)
//! └────────┬────────┘
//!          │ Submit (all 6 digits present)
//!          ▼
//! ┌─────────────────┐   Rejected   ┌─────────────────┐
//! │   Submitting    │ ───────────► │     Failed      │
//! └────────┬────────┘              └────────┬────────┘
//!          │ Accepted                       │ Retry
//!          ▼                                ▼
//! ┌─────────────────┐                   Entering
//! │     Success     │ (terminal)
//! └─────────────────┘
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub otp_machine(Entering)

    Entering => {
        Submit => Submitting
    },
    Submitting => {
        Accepted => Success,
        Rejected => Failed
    },
    Failed => {
        Retry => Entering
    }
}

pub use otp_machine::Input as OtpMachineInput;
pub use otp_machine::State as OtpMachineState;
pub use otp_machine::StateMachine as OtpMachine;

/// OTP flow state for display and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpState {
    /// Collecting digits.
    Entering,
    /// Waiting for the server to verify the code.
    Submitting,
    /// Code accepted; tokens stored.
    Success,
    /// Code rejected.
    Failed,
}

impl OtpState {
    /// Returns true once the flow can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OtpState::Success)
    }
}

impl From<&OtpMachineState> for OtpState {
    fn from(state: &OtpMachineState) -> Self {
        match state {
            OtpMachineState::Entering => OtpState::Entering,
            OtpMachineState::Submitting => OtpState::Submitting,
            OtpMachineState::Success => OtpState::Success,
            OtpMachineState::Failed => OtpState::Failed,
        }
    }
}
