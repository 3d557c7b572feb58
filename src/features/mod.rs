//! # Features
//!
//! - `reminders`: periodic delivery of due events
//! - `connection`: transport session supervision
//! - `assistant`: generative replies for free text
//! - `rate_limiting`: per-sender assistant limits

pub mod assistant;
pub mod connection;
pub mod rate_limiting;
pub mod reminders;

pub use assistant::{Assistant, OpenAiAssistant};
pub use connection::{ConnectionState, ConnectionSupervisor, ReconnectReason};
pub use rate_limiting::RateLimiter;
pub use reminders::{ReminderScheduler, TickReport};
