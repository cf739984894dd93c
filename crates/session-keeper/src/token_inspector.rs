//! Access token expiry inspection.
//!
//! Reads the claims segment of a compact JWT **without verifying the
//! signature**. The result is only a hint for deciding when to refresh
//! proactively; it is not an authentication check. The backend stays the
//! authority on whether a token is valid, and nothing here may be used to
//! grant access.

use crate::DecodeError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Lead time before expiry at which a token counts as expiring.
pub const DEFAULT_EXPIRY_HORIZON: Duration = Duration::from_secs(30 * 60);

// Issuers differ on whether they pad the payload segment.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims carried in an access token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at, seconds since the Unix epoch
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    /// Any other claims, kept as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Decode the claims of a compact token. The signature is not checked.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Malformed(segments.len()));
    }

    let payload = BASE64_URL.decode(segments[1])?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Expiry time of `token`, if it can be decoded and carries `exp`.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode(token).ok()?.exp?;
    DateTime::from_timestamp(exp, 0)
}

/// Whether `token` expires within `horizon` of now.
pub fn is_expiring_soon(token: &str, horizon: Duration) -> bool {
    is_expiring_soon_at(token, horizon, Utc::now())
}

/// Whether `token` expires within `horizon` of `now`.
///
/// Errs on the side of refreshing: a token that cannot be decoded, or that
/// has no `exp`, is always expiring. A token with exactly `horizon` left is
/// expiring too.
pub fn is_expiring_soon_at(token: &str, horizon: Duration, now: DateTime<Utc>) -> bool {
    match decode(token) {
        Ok(Claims { exp: Some(exp), .. }) => {
            let remaining = exp.saturating_sub(now.timestamp());
            remaining <= horizon_secs(horizon)
        }
        Ok(_) => {
            debug!("Access token has no exp claim, treating as expiring");
            true
        }
        Err(e) => {
            debug!(error = %e, "Access token could not be decoded, treating as expiring");
            true
        }
    }
}

/// Time until `token` enters its expiry horizon.
///
/// `Some(Duration::ZERO)` once it is already inside the horizon, `None` when
/// the expiry cannot be read.
pub fn refresh_due_in(token: &str, horizon: Duration, now: DateTime<Utc>) -> Option<Duration> {
    let exp = decode(token).ok()?.exp?;
    let due = exp
        .saturating_sub(horizon_secs(horizon))
        .saturating_sub(now.timestamp());
    Some(Duration::from_secs(u64::try_from(due).unwrap_or(0)))
}

fn horizon_secs(horizon: Duration) -> i64 {
    i64::try_from(horizon.as_secs()).unwrap_or(i64::MAX)
}
