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
use super::SessionData;
use crate::inbound::http::router::AppState;

/// Trade a refresh token for a new pair. The presented token is spent.
pub async fn refresh(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<RefreshRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<SessionData>, ApiError> {
    let Json(body) = payload?;
    let client = client_context(peer, &headers);

    state
        .auth_service
        .refresh(&body.refresh_token, &client)
        .await
        .map_err(ApiError::from)
        .map(|session| ApiSuccess::new(StatusCode::OK, session.into()))
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshRequestBody {
    refresh_token: String,
}
