//! # Reminders Feature
//!
//! Periodic delivery of stored events at their civil date and minute.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod scheduler;

pub use scheduler::{format_reminder, ReminderScheduler, TickReport, DEFAULT_TICK_INTERVAL};
