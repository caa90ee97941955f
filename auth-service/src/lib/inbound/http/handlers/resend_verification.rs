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
use crate::inbound::http::router::AppState;

pub async fn resend_verification(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ResendVerificationRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let Json(body) = payload?;
    let client = client_context(peer, &headers);

    state
        .auth_service
        .resend_verification(&body.email, &client)
        .await
        .map_err(ApiError::from)
        .map(|_| {
            ApiSuccess::new(
                StatusCode::OK,
                MessageData::new("If the account exists and is not verified, a new link was sent"),
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResendVerificationRequestBody {
    email: String,
}
