use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::AuthenticatedSession;
use crate::domain::auth::models::ClientContext;
use crate::domain::user::models::User;

pub mod confirm_reset;
pub mod health;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod resend_verification;
pub mod reset_password;
pub mod signup;
pub mod verify_email;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    CaptchaInvalid,
    InvalidToken,
    Unauthorized(String),
    EmailNotVerified,
    Forbidden(String),
    Conflict(String),
    UnprocessableEntity(String),
    TooManyRequests { retry_after: Duration },
    InternalServerError(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::CaptchaInvalid => (
                StatusCode::BAD_REQUEST,
                "captcha_invalid",
                "Captcha verification failed".to_string(),
            ),
            ApiError::InvalidToken => (
                StatusCode::BAD_REQUEST,
                "invalid_token",
                "Invalid or expired token".to_string(),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::EmailNotVerified => (
                StatusCode::UNAUTHORIZED,
                "email_not_verified",
                "Email is not verified".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            ApiError::TooManyRequests { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests".to_string(),
            ),
            ApiError::InternalServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let mut response =
            (status, Json(ApiResponseBody::new_error(status, code, message))).into_response();

        if let ApiError::TooManyRequests { retry_after } = self {
            // Round up so a client never retries before the window closes.
            let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds.max(1)));
        }

        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::BadRequest(msg) => ApiError::BadRequest(msg),
            AuthError::Validation(msg) => ApiError::UnprocessableEntity(msg),
            AuthError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            AuthError::EmailNotVerified => ApiError::EmailNotVerified,
            AuthError::Forbidden(msg) => ApiError::Forbidden(msg),
            AuthError::Conflict(msg) => ApiError::Conflict(msg),
            AuthError::RateLimited { retry_after } => ApiError::TooManyRequests { retry_after },
            AuthError::InvalidToken => ApiError::InvalidToken,
            AuthError::CaptchaRejected => ApiError::CaptchaInvalid,
            AuthError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed with internal error");
                ApiError::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, code: &str, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData {
                code: code.to_string(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub code: String,
    pub message: String,
}

/// Acknowledgement for flows that return no resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub message: String,
}

impl MessageData {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Sanitized user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub id: i64,
    pub email: String,
    pub nick: String,
    pub role: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            email: user.email.as_str().to_string(),
            nick: user.nick.as_str().to_string(),
            role: user.role.as_str().to_string(),
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub user: UserData,
    pub access_token: String,
    pub refresh_token: String,
}

impl From<AuthenticatedSession> for SessionData {
    fn from(session: AuthenticatedSession) -> Self {
        Self {
            user: (&session.user).into(),
            access_token: session.access_token,
            refresh_token: session.refresh_token,
        }
    }
}

/// Caller address from the TCP peer and device from `User-Agent`.
pub fn client_context(peer: SocketAddr, headers: &HeaderMap) -> ClientContext {
    let device_info = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|agent| agent.chars().take(255).collect::<String>());

    ClientContext {
        ip: peer.ip().to_string(),
        device_info,
    }
}
