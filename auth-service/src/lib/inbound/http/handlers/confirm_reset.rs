use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::domain::auth::models::PasswordResetConfirmation;
use crate::inbound::http::router::AppState;

pub async fn confirm_reset(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmResetRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let Json(body) = payload?;

    let confirmation = PasswordResetConfirmation {
        token: body.token,
        password: body.password,
        confirm_password: body.confirm_password,
    };

    state
        .auth_service
        .confirm_password_reset(confirmation)
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, MessageData::new("Password updated")))
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConfirmResetRequestBody {
    token: String,
    password: String,
    confirm_password: String,
}
