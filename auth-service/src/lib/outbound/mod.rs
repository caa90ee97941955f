pub mod captcha;
pub mod mail;
pub mod memory;
pub mod observer;
pub mod rate_limit;
pub mod repositories;
