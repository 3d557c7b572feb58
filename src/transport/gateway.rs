//! Delivery Gateway
//!
//! Thin send primitive shared by command replies and scheduled reminders.

use log::{debug, warn};
use std::sync::Arc;

use super::Transport;
use crate::core::error::ReminderError;

#[derive(Clone)]
pub struct DeliveryGateway {
    transport: Arc<dyn Transport>,
}

impl DeliveryGateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        DeliveryGateway { transport }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Send and report the outcome to the caller.
    pub async fn send(&self, recipient_id: &str, text: &str) -> Result<(), ReminderError> {
        if !self.transport.is_connected() {
            return Err(ReminderError::Connectivity(format!(
                "cannot deliver to {recipient_id}"
            )));
        }
        self.transport.send(recipient_id, text).await
    }

    /// Send a reply, logging and swallowing any failure.
    pub async fn reply(&self, recipient_id: &str, text: &str) {
        match self.send(recipient_id, text).await {
            Ok(()) => debug!("Replied to {recipient_id}"),
            Err(e) => warn!("Error sending reply to {recipient_id}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[tokio::test]
    async fn test_send_requires_connection() {
        let transport = Arc::new(MockTransport::disconnected());
        let gateway = DeliveryGateway::new(transport.clone());

        let err = gateway.send("u1", "hi").await.unwrap_err();
        assert!(matches!(err, ReminderError::Connectivity(_)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reply_swallows_failures() {
        let transport = Arc::new(MockTransport::connected().failing_for("bad"));
        let gateway = DeliveryGateway::new(transport.clone());

        gateway.reply("bad", "hi").await;
        gateway.reply("good", "hello").await;

        assert_eq!(transport.sent(), vec![("good".to_string(), "hello".to_string())]);
    }
}
