pub mod memory;
pub mod redis;

pub use memory::InMemoryRateLimiter;
pub use self::redis::RedisRateLimiter;
