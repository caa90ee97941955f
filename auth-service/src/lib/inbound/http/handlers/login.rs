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
use crate::domain::auth::models::LoginRequest;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<SessionData>, ApiError> {
    let Json(body) = payload?;
    let client = client_context(peer, &headers);

    let request = LoginRequest {
        email: body.email,
        password: body.password,
        captcha_token: body.captcha_token,
    };

    state
        .auth_service
        .login(request, &client)
        .await
        .map_err(ApiError::from)
        .map(|session| ApiSuccess::new(StatusCode::OK, session.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    email: String,
    password: String,
    #[serde(default)]
    captcha_token: Option<String>,
}
