use std::net::SocketAddr;
use std::sync::Arc;

use auth::TokenIssuer;
use auth_service::config::Config;
use auth_service::domain::auth::ports::AuthServicePort;
use auth_service::domain::auth::ports::CaptchaVerifier;
use auth_service::domain::auth::service::AuthService;
use auth_service::domain::auth::service::Collaborators;
use auth_service::domain::clock::SystemClock;
use auth_service::inbound::http::router::create_router;
use auth_service::outbound::captcha::DisabledCaptcha;
use auth_service::outbound::captcha::TurnstileVerifier;
use auth_service::outbound::mail::LogMailSender;
use auth_service::outbound::observer::TracingObserver;
use auth_service::outbound::rate_limit::RedisRateLimiter;
use auth_service::outbound::repositories::PostgresRefreshTokenRepository;
use auth_service::outbound::repositories::PostgresSingleUseTokenRepository;
use auth_service::outbound::repositories::PostgresUserRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "auth-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        access_ttl_minutes = config.jwt.access_ttl_minutes,
        refresh_ttl_days = config.sessions.refresh_ttl_days,
        revoke_on_reuse = config.sessions.revoke_on_reuse,
        rate_limit_max_attempts = config.rate_limit.max_attempts,
        rate_limit_window_secs = config.rate_limit.window_secs,
        captcha_enabled = config.captcha.enabled(),
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let rate_limiter = Arc::new(RedisRateLimiter::connect(&config.redis.url).await?);

    let captcha: Arc<dyn CaptchaVerifier> = if config.captcha.enabled() {
        Arc::new(TurnstileVerifier::new(config.captcha.turnstile_secret.clone())?)
    } else {
        tracing::warn!("Captcha secret not configured, captcha checks disabled");
        Arc::new(DisabledCaptcha)
    };

    let collaborators = Collaborators {
        mail: Arc::new(LogMailSender),
        captcha,
        observer: Arc::new(TracingObserver),
        clock: Arc::new(SystemClock),
    };

    let auth_service: Arc<dyn AuthServicePort> = Arc::new(AuthService::new(
        Arc::new(PostgresUserRepository::new(pg_pool.clone())),
        Arc::new(PostgresSingleUseTokenRepository::new(pg_pool.clone())),
        Arc::new(PostgresRefreshTokenRepository::new(pg_pool)),
        rate_limiter,
        Arc::new(TokenIssuer::new(config.jwt.secret.as_bytes())),
        config.auth_settings(),
        collaborators,
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(auth_service);

    if let Err(e) = axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    tracing::info!("Server exited successfully");

    Ok(())
}
