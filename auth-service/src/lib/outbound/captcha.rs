use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::auth::errors::CaptchaError;
use crate::domain::auth::ports::CaptchaVerifier;

const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Cloudflare Turnstile verification.
pub struct TurnstileVerifier {
    client: Client,
    secret: String,
    verify_url: String,
}

impl TurnstileVerifier {
    /// # Errors
    /// * `Unavailable` - HTTP client could not be built
    pub fn new(secret: String) -> Result<Self, CaptchaError> {
        Self::with_url(secret, TURNSTILE_VERIFY_URL.to_string())
    }

    pub fn with_url(secret: String, verify_url: String) -> Result<Self, CaptchaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| CaptchaError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            secret,
            verify_url,
        })
    }
}

#[async_trait]
impl CaptchaVerifier for TurnstileVerifier {
    async fn verify(&self, token: Option<&str>, remote_ip: &str) -> Result<bool, CaptchaError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(false);
        };

        let mut payload = HashMap::new();
        payload.insert("secret", self.secret.as_str());
        payload.insert("response", token);
        payload.insert("remoteip", remote_ip);

        let response = self
            .client
            .post(&self.verify_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CaptchaError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaptchaError::Unavailable(format!(
                "siteverify returned {}",
                response.status()
            )));
        }

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| CaptchaError::Unavailable(e.to_string()))?;

        if !body.success {
            tracing::debug!(error_codes = ?body.error_codes, "Captcha rejected");
        }

        Ok(body.success)
    }
}

/// Accepts everyone. Used when no captcha secret is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCaptcha;

#[async_trait]
impl CaptchaVerifier for DisabledCaptcha {
    async fn verify(&self, _token: Option<&str>, _remote_ip: &str) -> Result<bool, CaptchaError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_rejected_without_network() {
        let verifier =
            TurnstileVerifier::with_url("secret".to_string(), "http://127.0.0.1:9".to_string())
                .unwrap();

        assert!(!verifier.verify(None, "10.0.0.1").await.unwrap());
        assert!(!verifier.verify(Some(""), "10.0.0.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_an_error() {
        let verifier =
            TurnstileVerifier::with_url("secret".to_string(), "http://127.0.0.1:9".to_string())
                .unwrap();

        let result = verifier.verify(Some("token"), "10.0.0.1").await;
        assert!(matches!(result, Err(CaptchaError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_disabled_captcha_accepts() {
        assert!(DisabledCaptcha.verify(None, "10.0.0.1").await.unwrap());
    }
}
