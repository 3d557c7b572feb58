//! # Transport Layer
//!
//! The chat transport is an opaque collaborator. The rest of the bot only sees
//! the [`Transport`] trait, the closed set of [`InboundEvent`]s it emits, and the
//! [`DeliveryGateway`] send primitive.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod discord;
pub mod gateway;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

use crate::core::error::ReminderError;

pub use discord::DiscordTransport;
pub use gateway::DeliveryGateway;

/// Notifications delivered by the transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Session established (or resumed)
    Connected,
    /// Session dropped
    Disconnected,
    /// Another session took over this identity; a fresh session is required
    StreamReplaced,
    /// Text message from a subscriber
    Message { sender: String, text: String },
}

/// A single live chat session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the session. Returns once the session is usable or has failed.
    async fn connect(&self) -> Result<(), ReminderError>;

    fn is_connected(&self) -> bool;

    async fn disconnect(&self);

    /// Send `text` to a canonical recipient handle.
    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), ReminderError>;
}

/// Canonical form of a chat handle: the local part before any `@authority` suffix.
pub fn canonical_recipient(handle: &str) -> String {
    handle
        .split('@')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
