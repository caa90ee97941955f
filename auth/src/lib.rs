//! Authentication primitives library
//!
//! Provides the cryptographic building blocks of the credential and session
//! lifecycle:
//! - Password hashing (Argon2id)
//! - Access token signing and verification (HS256 JWT, algorithm pinned)
//! - Opaque token generation and lookup hashing (refresh and single-use tokens)
//!
//! Storage, rate limiting and flow orchestration live in the service that
//! consumes this crate.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Access Tokens
//! ```
//! use auth::TokenIssuer;
//! use chrono::Duration;
//! use chrono::Utc;
//!
//! let issuer = TokenIssuer::new(b"secret_key_at_least_32_bytes_long!");
//! let now = Utc::now();
//!
//! let token = issuer
//!     .sign(42, "participant", "Alice", Duration::minutes(15), now)
//!     .unwrap();
//! let claims = issuer.verify(&token, now).unwrap();
//! assert_eq!(claims.user_id, 42);
//! assert_eq!(claims.role, "participant");
//! ```
//!
//! ## Opaque Tokens
//! ```
//! use auth::token;
//!
//! let raw = token::generate().unwrap();
//! assert_eq!(raw.len(), 64);
//! assert_eq!(token::lookup_hash(&raw), token::lookup_hash(&raw));
//! ```

pub mod issuer;
pub mod jwt;
pub mod password;
pub mod token;

// Re-export commonly used items
pub use issuer::TokenIssuer;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::TokenError;
