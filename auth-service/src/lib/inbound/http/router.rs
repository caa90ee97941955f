use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::confirm_reset::confirm_reset;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::refresh::refresh;
use super::handlers::resend_verification::resend_verification;
use super::handlers::reset_password::reset_password;
use super::handlers::signup::signup;
use super::handlers::verify_email::verify_email;
use super::middleware::authenticate as auth_middleware;
use crate::domain::auth::ports::AuthServicePort;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
}

/// Build the HTTP application.
///
/// Handlers read the caller address through `ConnectInfo`, so serve the
/// router with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(auth_service: Arc<dyn AuthServicePort>) -> Router {
    let state = AppState { auth_service };

    let public_routes = Router::new()
        .route("/api/v1/auth/signup", post(signup))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/verify-email", post(verify_email))
        .route("/api/v1/auth/resend-verification", post(resend_verification))
        .route("/api/v1/auth/reset-password", post(reset_password))
        .route("/api/v1/auth/reset-password/confirm", post(confirm_reset))
        .route("/api/v1/health", get(health))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/api/v1/auth/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Headers stay out of the span: they carry bearer tokens.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri().path(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri().path(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::auth::service::AuthService;
    use crate::domain::auth::service::AuthSettings;
    use crate::domain::auth::service::Collaborators;
    use crate::domain::clock::ManualClock;
    use crate::outbound::captcha::DisabledCaptcha;
    use crate::outbound::mail::InMemoryMailSender;
    use crate::outbound::memory::InMemoryStore;
    use crate::outbound::observer::NoopObserver;
    use crate::outbound::rate_limit::InMemoryRateLimiter;

    fn router() -> Router {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::default());

        create_router(Arc::new(AuthService::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(InMemoryRateLimiter::new(clock.clone())),
            Arc::new(auth::TokenIssuer::new(b"test_secret_key_at_least_32_bytes!")),
            AuthSettings::default(),
            Collaborators {
                mail: Arc::new(InMemoryMailSender::new()),
                captcha: Arc::new(DisabledCaptcha),
                observer: Arc::new(NoopObserver),
                clock,
            },
        )))
    }

    #[tokio::test]
    async fn test_health_route() {
        for path in ["/api/v1/health", "/health"] {
            let response = router()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
    }

    #[tokio::test]
    async fn test_logout_is_protected() {
        let response = router()
            .oneshot(
                Request::post("/api/v1/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = router()
            .oneshot(Request::get("/api/v1/users").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
