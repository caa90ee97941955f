pub mod auth;
pub mod clock;
pub mod rate_limit;
pub mod session;
pub mod token;
pub mod user;
