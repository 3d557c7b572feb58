//! # Rate Limiting Feature
//!
//! Caps how often one sender can reach the assistant.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod limiter;

pub use limiter::RateLimiter;
