//! Session error types.

use thiserror::Error;
use token_vault::StorageError;

/// Failure to read claims out of an access token.
///
/// Never shown to the user: an undecodable token is simply treated as
/// expiring.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Token is not three dot-separated segments
    #[error("Malformed token: expected 3 segments, found {0}")]
    Malformed(usize),

    /// Payload segment is not valid base64url
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload is not a JSON claims object
    #[error("Invalid claims payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from a network exchange with the auth service.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Server answered with a non-success status
    #[error("Request rejected: HTTP {status} ({body_summary})")]
    Rejected { status: u16, body_summary: String },

    /// Transport failure, timeout or undecodable response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Client could not be configured
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExchangeError {
    /// Returns true if the request might succeed if sent again unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            ExchangeError::Rejected { status, .. } => *status >= 500,
            ExchangeError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().is_some_and(|s| s.is_server_error())
            }
            ExchangeError::Config(_) => false,
        }
    }
}

/// Token refresh error type.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// Nothing to refresh with; no request was sent
    #[error("No refresh token stored")]
    NoRefreshToken,

    /// The refresh exchange failed; the session has been cleared
    #[error("Token refresh failed: {0}")]
    RequestFailed(#[from] ExchangeError),

    /// Token store could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RefreshError {
    /// Returns true if the user has to log in again.
    ///
    /// Only a failed exchange forces a new login. A missing refresh token
    /// and storage failures are local; the session is left as it is.
    pub fn requires_login(&self) -> bool {
        matches!(self, RefreshError::RequestFailed(_))
    }
}

/// Local validation failures while entering a one-time code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpValidationError {
    #[error("Slot {slot} only accepts digits, got {ch:?}")]
    NotADigit { slot: usize, ch: char },

    #[error("Slot {0} is out of range")]
    SlotOutOfRange(usize),

    #[error("Code is too long: {0} digits")]
    TooLong(usize),

    #[error("Please enter all 6 digits")]
    Incomplete { missing: Vec<usize> },

    #[error("Phone number is required")]
    MissingPhoneNumber,
}

/// One-time-password login error type.
#[derive(Error, Debug)]
pub enum OtpError {
    /// Input rejected locally; nothing was sent
    #[error(transparent)]
    Validation(#[from] OtpValidationError),

    /// Server rejected the phone number and code
    #[error("Verification failed: {0}")]
    Auth(String),

    /// Resend requested before the cooldown elapsed
    #[error("Resend available in {remaining_secs}s")]
    ResendCooldown { remaining_secs: u64 },

    /// A code could not be requested
    #[error("Could not send code: {0}")]
    Resend(String),

    /// Operation not allowed in the current flow state
    #[error("Invalid OTP state transition: {0}")]
    InvalidState(String),

    /// Verified tokens could not be stored
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias using RefreshError.
pub type RefreshResult<T> = Result<T, RefreshError>;

/// Result type alias using OtpError.
pub type OtpResult<T> = Result<T, OtpError>;
