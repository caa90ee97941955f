use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::domain::auth::models::Principal;
use crate::inbound::http::router::AppState;

/// End every session of the authenticated caller.
pub async fn logout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    state
        .auth_service
        .logout(&principal)
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, MessageData::new("Logged out")))
}
