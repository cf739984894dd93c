//! Phone + one-time-code session establishment.

use crate::http::{build_client, post_json};
use crate::ExchangeError;
use async_trait::async_trait;
use serde::Serialize;
use session_config::Config;
use std::time::Duration;
use token_vault::TokenPair;
use tracing::info;

pub const SEND_OTP_PATH: &str = "/auth/send-otp";
pub const VERIFY_OTP_PATH: &str = "/auth/verify-otp";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOtpRequest<'a> {
    phone_number: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOtpRequest<'a> {
    phone_number: &'a str,
    otp: &'a str,
}

/// Issues the first token pair of a session.
#[async_trait]
pub trait SessionExchange: Send + Sync {
    /// Ask the server to send a code to `phone_number`.
    async fn request_code(&self, phone_number: &str) -> Result<(), ExchangeError>;

    /// Trade a phone number and code for a token pair.
    async fn verify(&self, phone_number: &str, otp: &str) -> Result<TokenPair, ExchangeError>;
}

/// Session exchange backed by the auth service's OTP endpoints.
#[derive(Clone)]
pub struct HttpSessionExchange {
    http_client: reqwest::Client,
    send_url: String,
    verify_url: String,
}

impl HttpSessionExchange {
    pub fn new(
        send_url: impl Into<String>,
        verify_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExchangeError> {
        Ok(Self {
            http_client: build_client(timeout)?,
            send_url: send_url.into(),
            verify_url: verify_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ExchangeError> {
        Self::new(
            config.endpoint(SEND_OTP_PATH),
            config.endpoint(VERIFY_OTP_PATH),
            config.refresh.request_timeout(),
        )
    }
}

#[async_trait]
impl SessionExchange for HttpSessionExchange {
    async fn request_code(&self, phone_number: &str) -> Result<(), ExchangeError> {
        post_json(
            &self.http_client,
            &self.send_url,
            &SendOtpRequest { phone_number },
            "send_otp",
        )
        .await?;
        info!("One-time code requested");
        Ok(())
    }

    async fn verify(&self, phone_number: &str, otp: &str) -> Result<TokenPair, ExchangeError> {
        let response = post_json(
            &self.http_client,
            &self.verify_url,
            &VerifyOtpRequest { phone_number, otp },
            "verify_otp",
        )
        .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_bodies_use_camel_case() {
        let send = serde_json::to_value(SendOtpRequest {
            phone_number: "+15550100",
        })
        .unwrap();
        assert_eq!(send, serde_json::json!({ "phoneNumber": "+15550100" }));

        let verify = serde_json::to_value(VerifyOtpRequest {
            phone_number: "+15550100",
            otp: "123456",
        })
        .unwrap();
        assert_eq!(
            verify,
            serde_json::json!({ "phoneNumber": "+15550100", "otp": "123456" })
        );
    }

    #[test]
    fn endpoints_follow_config() {
        let mut config = Config::default();
        config.api_url = "https://staging.example.test".to_string();
        let exchange = HttpSessionExchange::from_config(&config).unwrap();
        assert_eq!(exchange.send_url, "https://staging.example.test/auth/send-otp");
        assert_eq!(exchange.verify_url, "https://staging.example.test/auth/verify-otp");
    }
}
