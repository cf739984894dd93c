//! Shared HTTP plumbing for the auth service clients.

use crate::ExchangeError;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tracing::{debug, warn};

/// Length and digest of a response body. Auth responses may echo
/// credentials, so raw bodies are never logged.
pub(crate) fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ExchangeError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ExchangeError::Config(format!("failed to build HTTP client: {}", e)))
}

/// POST a JSON body and return the response if the status is 2xx.
pub(crate) async fn post_json<B>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
    operation: &'static str,
) -> Result<reqwest::Response, ExchangeError>
where
    B: Serialize + ?Sized,
{
    debug!(url = %url, operation, "Sending auth request");

    let response = client
        .post(url)
        .header("Accept", "application/json")
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body_summary = summarize_response_body(&body);
        warn!(status = %status, body_summary = %body_summary, operation, "Auth request rejected");
        return Err(ExchangeError::Rejected {
            status: status.as_u16(),
            body_summary,
        });
    }

    Ok(response)
}
