use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::client_context;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::auth::models::SignupRequest;
use crate::inbound::http::router::AppState;

/// Register an account. No session is started until the email is verified.
pub async fn signup(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<SignupRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<SignupResponseData>, ApiError> {
    let Json(body) = payload?;
    let client = client_context(peer, &headers);

    state
        .auth_service
        .signup(body.into(), &client)
        .await
        .map_err(ApiError::from)
        .map(|user_id| {
            ApiSuccess::new(
                StatusCode::OK,
                SignupResponseData {
                    user_id: user_id.0,
                },
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignupRequestBody {
    email: String,
    password: String,
    confirm_password: String,
    nick: String,
    #[serde(default)]
    captcha_token: Option<String>,
}

impl From<SignupRequestBody> for SignupRequest {
    fn from(body: SignupRequestBody) -> Self {
        SignupRequest {
            email: body.email,
            password: body.password,
            confirm_password: body.confirm_password,
            nick: body.nick,
            captcha_token: body.captcha_token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupResponseData {
    pub user_id: i64,
}
