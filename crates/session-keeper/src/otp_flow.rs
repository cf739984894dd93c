//! Interactive phone + one-time-code login.

use crate::otp_fsm::{OtpMachine, OtpMachineInput, OtpState};
use crate::{
    OtpCode, OtpError, OtpResult, OtpValidationError, ResendCooldown, SessionExchange,
};
use std::sync::Arc;
use std::time::Duration;
use token_vault::{TokenPair, TokenStore};
use tracing::{debug, info, warn};

/// A single login attempt for one phone number.
///
/// Holds the digits typed so far, the resend cooldown and the flow state.
/// A verified pair is written to the token store before the flow reports
/// success.
pub struct OtpFlow {
    phone_number: String,
    code: OtpCode,
    fsm: OtpMachine,
    cooldown: ResendCooldown,
    exchange: Arc<dyn SessionExchange>,
    store: Arc<TokenStore>,
    last_error: Option<String>,
}

impl OtpFlow {
    /// Request the first code for `phone_number` and start the cooldown.
    pub async fn start(
        phone_number: &str,
        exchange: Arc<dyn SessionExchange>,
        store: Arc<TokenStore>,
        cooldown: Duration,
    ) -> OtpResult<Self> {
        let phone_number = normalize_phone(phone_number)?;

        exchange
            .request_code(&phone_number)
            .await
            .map_err(|e| OtpError::Resend(e.to_string()))?;

        info!("OTP login started");

        Ok(Self {
            phone_number,
            code: OtpCode::new(),
            fsm: OtpMachine::new(),
            cooldown: ResendCooldown::new(cooldown),
            exchange,
            store,
            last_error: None,
        })
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn state(&self) -> OtpState {
        OtpState::from(self.fsm.state())
    }

    pub fn code(&self) -> &OtpCode {
        &self.code
    }

    /// Message from the last failed submit or resend, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn resend_remaining_secs(&self) -> u64 {
        self.cooldown.remaining_secs()
    }

    pub fn can_resend(&self) -> bool {
        self.state() == OtpState::Entering && self.cooldown.is_ready()
    }

    pub fn input(&mut self, slot: usize, ch: char) -> OtpResult<()> {
        self.ensure_entering("input")?;
        Ok(self.code.input(slot, ch)?)
    }

    pub fn backspace(&mut self, slot: usize) -> OtpResult<()> {
        self.ensure_entering("backspace")?;
        Ok(self.code.backspace(slot)?)
    }

    /// Replace the digits with a pasted code.
    pub fn fill(&mut self, code: &str) -> OtpResult<()> {
        self.ensure_entering("fill")?;
        Ok(self.code.fill(code)?)
    }

    /// Submit the entered code.
    ///
    /// An incomplete code is rejected without contacting the server and the
    /// flow stays in `Entering`. A rejected code returns the flow to
    /// `Entering` with the digits kept for correction.
    pub async fn submit(&mut self) -> OtpResult<TokenPair> {
        self.ensure_entering("submit")?;

        let otp = match self.code.validate() {
            Ok(otp) => otp,
            Err(e) => {
                debug!(error = %e, "OTP submit rejected locally");
                self.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };

        self.transition(&OtpMachineInput::Submit)?;

        let result = match self.exchange.verify(&self.phone_number, &otp).await {
            Ok(pair) => self.store.store_pair(&pair).map(|_| pair).map_err(OtpError::from),
            Err(e) => Err(OtpError::Auth(e.to_string())),
        };

        match result {
            Ok(pair) => {
                self.transition(&OtpMachineInput::Accepted)?;
                self.last_error = None;
                info!("OTP verified, session established");
                Ok(pair)
            }
            Err(e) => {
                warn!(error = %e, "OTP verification failed");
                self.transition(&OtpMachineInput::Rejected)?;
                self.last_error = Some(e.to_string());
                self.transition(&OtpMachineInput::Retry)?;
                Err(e)
            }
        }
    }

    /// Request a new code.
    ///
    /// Refused while the cooldown runs, with nothing changed. Otherwise the
    /// digits are cleared, focus returns to the first slot and the cooldown
    /// restarts.
    pub async fn resend(&mut self) -> OtpResult<()> {
        self.ensure_entering("resend")?;

        if !self.cooldown.is_ready() {
            return Err(OtpError::ResendCooldown {
                remaining_secs: self.cooldown.remaining_secs(),
            });
        }

        if let Err(e) = self.exchange.request_code(&self.phone_number).await {
            warn!(error = %e, "OTP resend failed");
            self.last_error = Some(e.to_string());
            return Err(OtpError::Resend(e.to_string()));
        }

        self.code.clear();
        self.cooldown.restart();
        self.last_error = None;
        info!("OTP resent");
        Ok(())
    }

    fn ensure_entering(&self, action: &str) -> OtpResult<()> {
        let state = self.state();
        if state != OtpState::Entering {
            return Err(OtpError::InvalidState(format!(
                "Cannot {} in state {:?}",
                action, state
            )));
        }
        Ok(())
    }

    fn transition(&mut self, input: &OtpMachineInput) -> OtpResult<OtpState> {
        let old_state = self.state();

        self.fsm.consume(input).map_err(|_| {
            OtpError::InvalidState(format!("Cannot apply {:?} in state {:?}", input, old_state))
        })?;

        let new_state = self.state();
        debug!(old_state = ?old_state, new_state = ?new_state, "OTP state transition");
        Ok(new_state)
    }
}

fn normalize_phone(phone_number: &str) -> Result<String, OtpValidationError> {
    let trimmed = phone_number.trim();
    if trimmed.is_empty() {
        return Err(OtpValidationError::MissingPhoneNumber);
    }
    Ok(trimmed.to_string())
}
