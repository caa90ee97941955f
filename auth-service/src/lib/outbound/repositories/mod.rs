pub mod refresh_token;
pub mod single_use_token;
pub mod user;

pub use refresh_token::PostgresRefreshTokenRepository;
pub use single_use_token::PostgresSingleUseTokenRepository;
pub use user::PostgresUserRepository;
