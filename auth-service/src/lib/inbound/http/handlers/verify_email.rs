use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::inbound::http::router::AppState;

/// Accepts the token either as `?token=` (mail links) or in the JSON body.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<TokenParams>,
    body: Option<Json<TokenParams>>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let token = query
        .token
        .or_else(|| body.and_then(|Json(body)| body.token))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing token".to_string()))?;

    state
        .auth_service
        .verify_email(&token)
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, MessageData::new("Email verified")))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenParams {
    #[serde(default)]
    token: Option<String>,
}
