use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::auth::errors::MailError;
use crate::domain::auth::ports::MailSender;
use crate::domain::token::models::TokenPurpose;
use crate::domain::user::models::EmailAddress;

/// Writes a delivery notice to the log instead of sending mail. The token
/// itself is never logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(
        &self,
        to: &EmailAddress,
        purpose: TokenPurpose,
        _token: &str,
    ) -> Result<(), MailError> {
        tracing::info!(
            to = %to.masked(),
            purpose = %purpose,
            "Mail delivery skipped (no transport configured)"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: EmailAddress,
    pub purpose: TokenPurpose,
    pub token: String,
}

/// Keeps every message in memory so tests can read the tokens back.
#[derive(Debug, Default)]
pub struct InMemoryMailSender {
    outbox: Mutex<Vec<SentMail>>,
}

impl InMemoryMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent token sent to `to` for `purpose`.
    pub async fn last_token(&self, to: &EmailAddress, purpose: TokenPurpose) -> Option<String> {
        self.outbox
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| &m.to == to && m.purpose == purpose)
            .map(|m| m.token.clone())
    }

    pub async fn sent_count(&self) -> usize {
        self.outbox.lock().await.len()
    }
}

#[async_trait]
impl MailSender for InMemoryMailSender {
    async fn send(
        &self,
        to: &EmailAddress,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<(), MailError> {
        self.outbox.lock().await.push(SentMail {
            to: to.clone(),
            purpose,
            token: token.to_string(),
        });
        Ok(())
    }
}
