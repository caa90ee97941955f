use std::sync::Mutex;

use crate::domain::auth::models::AuthEvent;
use crate::domain::auth::ports::AuthObserver;

/// Emits every event as a structured log line under the `auth_events`
/// target, ready for log-based counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AuthObserver for TracingObserver {
    fn record(&self, event: AuthEvent) {
        match &event {
            AuthEvent::RefreshTokenReuse { user_id } => {
                tracing::warn!(target: "auth_events", event = event.name(), user_id = %user_id);
            }
            AuthEvent::SignupSucceeded { user_id }
            | AuthEvent::LoginSucceeded { user_id }
            | AuthEvent::RefreshSucceeded { user_id }
            | AuthEvent::LoggedOut { user_id }
            | AuthEvent::EmailVerified { user_id }
            | AuthEvent::PasswordResetCompleted { user_id } => {
                tracing::info!(target: "auth_events", event = event.name(), user_id = %user_id);
            }
            AuthEvent::RateLimited { action } => {
                tracing::info!(target: "auth_events", event = event.name(), action = %action);
            }
            AuthEvent::LoginFailed
            | AuthEvent::RefreshFailed
            | AuthEvent::PasswordResetRequested
            | AuthEvent::CaptchaRejected => {
                tracing::info!(target: "auth_events", event = event.name());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AuthObserver for NoopObserver {
    fn record(&self, _event: AuthEvent) {}
}

/// Keeps events in order of arrival.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<AuthEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuthEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AuthObserver for RecordingObserver {
    fn record(&self, event: AuthEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
