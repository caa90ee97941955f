use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::client_context;
use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::domain::auth::models::PasswordResetRequest;
use crate::inbound::http::router::AppState;

/// Request a reset link. The answer is the same whether or not the email is
/// registered.
pub async fn reset_password(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ResetPasswordRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let Json(body) = payload?;
    let client = client_context(peer, &headers);

    let request = PasswordResetRequest {
        email: body.email,
        captcha_token: body.captcha_token,
    };

    state
        .auth_service
        .request_password_reset(request, &client)
        .await
        .map_err(ApiError::from)
        .map(|_| {
            ApiSuccess::new(
                StatusCode::OK,
                MessageData::new("If the account exists, a reset link was sent"),
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResetPasswordRequestBody {
    email: String,
    #[serde(default)]
    captcha_token: Option<String>,
}
