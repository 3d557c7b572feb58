//! Inbound event dispatch
//!
//! Drains the transport's notification channel. Connection notifications go to
//! the supervisor; messages are handled on their own tasks so a slow assistant
//! reply never holds up reconnect handling.

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::command_handler::CommandHandler;
use crate::features::connection::{ConnectionSupervisor, ReconnectReason};
use crate::transport::InboundEvent;

#[derive(Clone)]
pub struct EventRouter {
    handler: Arc<CommandHandler>,
    supervisor: ConnectionSupervisor,
}

impl EventRouter {
    pub fn new(handler: Arc<CommandHandler>, supervisor: ConnectionSupervisor) -> Self {
        EventRouter {
            handler,
            supervisor,
        }
    }

    pub fn route(&self, event: InboundEvent) {
        match event {
            InboundEvent::Connected => {
                info!("Connected to chat transport");
                self.supervisor.mark_connected();
            }
            InboundEvent::Disconnected => {
                warn!("Disconnected from chat transport");
                self.supervisor.mark_disconnected();
                self.supervisor.request_reconnect(ReconnectReason::Dropped);
            }
            InboundEvent::StreamReplaced => {
                warn!("Stream replaced, reconnecting...");
                self.supervisor.mark_disconnected();
                self.supervisor
                    .request_reconnect(ReconnectReason::StreamReplaced);
            }
            InboundEvent::Message { sender, text } => {
                debug!("Message from {sender}");
                let handler = self.handler.clone();
                tokio::spawn(async move {
                    handler.handle_message(&sender, &text).await;
                });
            }
        }
    }

    /// Route events until the transport side of the channel is dropped.
    pub async fn run(self, mut inbound: mpsc::UnboundedReceiver<InboundEvent>) {
        while let Some(event) = inbound.recv().await {
            self.route(event);
        }
        debug!("Inbound channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_handler::tests::{handler, EchoAssistant};
    use crate::command_handler::HELP_TEXT;
    use crate::database::tests::test_store;
    use crate::features::connection::ConnectionState;
    use crate::transport::mock::MockTransport;
    use crate::transport::Transport;
    use std::time::Duration;

    async fn eventually<F: Fn() -> bool>(check: F) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_routes_messages_and_drops() {
        let (db, _dir) = test_store("2026-10-19T10:00:00+07:00").await;
        let transport = Arc::new(MockTransport::connected());
        let supervisor = ConnectionSupervisor::spawn(transport.clone());
        let router = EventRouter::new(
            Arc::new(handler(db, transport.clone(), Arc::new(EchoAssistant::default()))),
            supervisor.clone(),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let running = tokio::spawn(router.run(rx));

        tx.send(InboundEvent::Message {
            sender: "42".into(),
            text: "/set".into(),
        })
        .unwrap();
        eventually(|| transport.sent().len() == 1).await;
        assert_eq!(transport.sent()[0], ("42".to_string(), HELP_TEXT.to_string()));

        transport.drop_connection();
        tx.send(InboundEvent::Disconnected).unwrap();
        eventually(|| transport.is_connected()).await;
        eventually(|| supervisor.state() == ConnectionState::Connected).await;

        tx.send(InboundEvent::StreamReplaced).unwrap();
        eventually(|| transport.disconnects() == 1 && transport.is_connected()).await;

        drop(tx);
        running.await.unwrap();
    }
}
