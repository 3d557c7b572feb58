//! # Core Module
//!
//! Configuration, error taxonomy, civil calendar and message splitting shared by
//! every layer of the bot.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod civil;
pub mod config;
pub mod error;
pub mod response;

pub use civil::{validate_date, validate_time, CivilStamp, Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::ReminderError;
pub use response::{chunk_for_message, chunk_text, MESSAGE_LIMIT};
