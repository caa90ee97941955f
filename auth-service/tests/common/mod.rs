use std::net::SocketAddr;
use std::sync::Arc;

use auth::TokenIssuer;
use auth_service::domain::auth::service::AuthService;
use auth_service::domain::auth::service::AuthSettings;
use auth_service::domain::auth::service::Collaborators;
use auth_service::domain::clock::ManualClock;
use auth_service::domain::token::models::TokenPurpose;
use auth_service::domain::user::models::EmailAddress;
use auth_service::inbound::http::router::create_router;
use auth_service::outbound::captcha::DisabledCaptcha;
use auth_service::outbound::mail::InMemoryMailSender;
use auth_service::outbound::memory::InMemoryStore;
use auth_service::outbound::observer::RecordingObserver;
use auth_service::outbound::rate_limit::InMemoryRateLimiter;
use serde_json::json;
use serde_json::Value;

pub const PASSWORD: &str = "Secret1!";

/// Test application that spawns the real router backed by in-memory
/// adapters and a manual clock.
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub store: Arc<InMemoryStore>,
    pub mail: Arc<InMemoryMailSender>,
    pub observer: Arc<RecordingObserver>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(InMemoryStore::new());
        let mail = Arc::new(InMemoryMailSender::new());
        let observer = Arc::new(RecordingObserver::new());
        let clock = Arc::new(ManualClock::default());
        let limiter = Arc::new(InMemoryRateLimiter::new(clock.clone()));

        let auth_service = Arc::new(AuthService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            limiter,
            Arc::new(TokenIssuer::new(
                b"test-secret-key-for-jwt-signing-at-least-32-bytes",
            )),
            AuthSettings::default(),
            Collaborators {
                mail: mail.clone(),
                captcha: Arc::new(DisabledCaptcha),
                observer: observer.clone(),
                clock: clock.clone(),
            },
        ));

        let router = create_router(auth_service);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::new(),
            store,
            mail,
            observer,
            clock,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    pub async fn signup(&self, email: &str, nick: &str) -> reqwest::Response {
        self.post("/api/v1/auth/signup")
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "confirm_password": PASSWORD,
                "nick": nick,
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/v1/auth/login")
            .json(&json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post("/api/v1/auth/refresh")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Last token mailed to `email` for `purpose`.
    pub async fn mailed_token(&self, email: &str, purpose: TokenPurpose) -> String {
        let address = EmailAddress::new(email.to_string()).unwrap();
        self.mail
            .last_token(&address, purpose)
            .await
            .expect("No token was mailed")
    }

    /// Sign up and verify an account, returning its id.
    pub async fn verified_user(&self, email: &str, nick: &str) -> i64 {
        let body: Value = self.signup(email, nick).await.json().await.unwrap();
        let user_id = body["data"]["user_id"].as_i64().unwrap();

        let token = self.mailed_token(email, TokenPurpose::EmailVerification).await;
        let response = self
            .post(&format!("/api/v1/auth/verify-email?token={}", token))
            .send()
            .await
            .expect("Failed to execute request");
        assert!(response.status().is_success());

        user_id
    }

    /// Verified account plus a fresh login, returning the session payload.
    pub async fn logged_in_user(&self, email: &str, nick: &str) -> Value {
        self.verified_user(email, nick).await;
        let response = self.login(email, PASSWORD).await;
        assert!(response.status().is_success());
        let body: Value = response.json().await.unwrap();
        body["data"].clone()
    }
}
