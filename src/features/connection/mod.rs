//! # Connection Supervision Feature
//!
//! Single-instance reconnect loop with exponential backoff.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod supervisor;

pub use supervisor::{
    Backoff, ConnectionState, ConnectionSupervisor, ReconnectReason, BACKOFF_CEILING,
    BACKOFF_FLOOR,
};
