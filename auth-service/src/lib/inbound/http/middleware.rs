use axum::extract::Request;
use axum::extract::State;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use super::handlers::ApiError;
use crate::inbound::http::router::AppState;

/// Verifies the bearer access token and stores the resulting
/// [`Principal`](crate::domain::auth::models::Principal) in request
/// extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_token_from_header(&req).map_err(IntoResponse::into_response)?;

    let principal = state
        .auth_service
        .authenticate(token)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Access token rejected");
            ApiError::from(e).into_response()
        })?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

fn extract_token_from_header(req: &Request) -> Result<&str, ApiError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header".to_string()))?;

    auth_str
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized(
                "Invalid Authorization header format. Expected: Bearer <token>".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request_with(header: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/v1/auth/logout");
        if let Some(value) = header {
            builder = builder.header(http::header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extracts_bearer_token() {
        let req = request_with(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_token_from_header(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_rejects_missing_or_malformed_header() {
        assert!(extract_token_from_header(&request_with(None)).is_err());
        assert!(extract_token_from_header(&request_with(Some("Basic dXNlcg=="))).is_err());
        assert!(extract_token_from_header(&request_with(Some("Bearer "))).is_err());
    }
}
