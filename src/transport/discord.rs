//! # Discord Transport
//!
//! Direct-message transport on the Discord gateway. Each `connect` builds a fresh
//! serenity client, drives it on its own task and waits for the gateway to report
//! ready. Gateway callbacks are flattened into [`InboundEvent`]s.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use async_trait::async_trait;
use log::{debug, info, warn};
use serenity::client::bridge::gateway::event::ShardStageUpdateEvent;
use serenity::client::bridge::gateway::ShardManager;
use serenity::gateway::ConnectionStage;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::event::ResumedEvent;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::prelude::{Client, Context, EventHandler, GatewayIntents};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use super::{InboundEvent, Transport};
use crate::core::error::ReminderError;
use crate::core::response::chunk_for_message;

/// How long a fresh gateway session may take to report ready
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// A running gateway client
struct Session {
    shard_manager: Arc<Mutex<ShardManager>>,
    runner: JoinHandle<Result<(), serenity::Error>>,
}

impl Session {
    async fn shutdown(self) {
        self.shard_manager.lock().await.shutdown_all().await;
        self.runner.abort();
    }
}

pub struct DiscordTransport {
    token: String,
    inbound: mpsc::UnboundedSender<InboundEvent>,
    connected: Arc<watch::Sender<bool>>,
    /// Set while we tear the session down ourselves, so no drop is reported
    stopping: Arc<AtomicBool>,
    session: Mutex<Option<Session>>,
    http: RwLock<Option<Arc<Http>>>,
}

impl DiscordTransport {
    pub fn new(token: impl Into<String>, inbound: mpsc::UnboundedSender<InboundEvent>) -> Self {
        let (connected, _) = watch::channel(false);
        DiscordTransport {
            token: token.into(),
            inbound,
            connected: Arc::new(connected),
            stopping: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(None),
            http: RwLock::new(None),
        }
    }

    fn intents() -> GatewayIntents {
        GatewayIntents::DIRECT_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    fn current_http(&self) -> Option<Arc<Http>> {
        self.http.read().ok().and_then(|guard| guard.clone())
    }

    fn set_http(&self, http: Option<Arc<Http>>) {
        if let Ok(mut guard) = self.http.write() {
            *guard = http;
        }
    }
}

async fn wait_until_ready(mut ready: watch::Receiver<bool>) -> bool {
    loop {
        if *ready.borrow_and_update() {
            return true;
        }
        if ready.changed().await.is_err() {
            return false;
        }
    }
}

/// Wait for the first ready signal of a session whose runner reports on `exited`.
///
/// A runner that stops first, a closed state channel and a session that stays
/// silent for `timeout` are all connect failures.
async fn await_ready(
    ready: watch::Receiver<bool>,
    exited: oneshot::Receiver<String>,
    timeout: Duration,
) -> Result<(), ReminderError> {
    tokio::select! {
        up = wait_until_ready(ready) => {
            if up {
                Ok(())
            } else {
                Err(ReminderError::Connectivity("connection state closed".to_string()))
            }
        }
        reason = exited => Err(ReminderError::Connectivity(
            reason.unwrap_or_else(|_| "gateway task failed".to_string()),
        )),
        _ = tokio::time::sleep(timeout) => Err(ReminderError::Connectivity(format!(
            "gateway not ready after {timeout:?}"
        ))),
    }
}

impl DiscordTransport {
    async fn stop_session(&self) {
        let stale = self.session.lock().await.take();
        if let Some(stale) = stale {
            self.stopping.store(true, Ordering::SeqCst);
            stale.shutdown().await;
        }
    }
}

#[async_trait]
impl Transport for DiscordTransport {
    async fn connect(&self) -> Result<(), ReminderError> {
        if self.is_connected() {
            return Ok(());
        }

        debug!("Shutting down any stale gateway session");
        self.stop_session().await;
        self.stopping.store(false, Ordering::SeqCst);

        let relay = GatewayRelay {
            inbound: self.inbound.clone(),
            connected: self.connected.clone(),
        };

        let mut client = Client::builder(&self.token, Self::intents())
            .event_handler(relay)
            .await
            .map_err(|e| ReminderError::Connectivity(format!("client creation failed: {e}")))?;

        let http = client.cache_and_http.http.clone();
        let shard_manager = client.shard_manager.clone();
        let connected = self.connected.clone();
        let inbound = self.inbound.clone();
        let stopping = self.stopping.clone();
        let (exited_tx, exited) = oneshot::channel();

        let runner = tokio::spawn(async move {
            let result = client.start().await;
            let was_connected = connected.send_replace(false);
            if was_connected && !stopping.load(Ordering::SeqCst) {
                let _ = inbound.send(InboundEvent::Disconnected);
            }
            let reason = match &result {
                Ok(()) => "gateway closed before ready".to_string(),
                Err(e) => e.to_string(),
            };
            let _ = exited_tx.send(reason);
            result
        });

        // park the session first so disconnect() can stop it while we wait
        *self.session.lock().await = Some(Session {
            shard_manager,
            runner,
        });
        if self.stopping.load(Ordering::SeqCst) {
            self.stop_session().await;
            return Err(ReminderError::Connectivity("transport is shutting down".to_string()));
        }

        if let Err(e) = await_ready(self.connected.subscribe(), exited, READY_TIMEOUT).await {
            self.stop_session().await;
            return Err(e);
        }

        self.set_http(Some(http));
        info!("Discord gateway session established");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    async fn disconnect(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.stop_session().await;
        self.connected.send_replace(false);
        self.set_http(None);
        info!("Discord gateway session closed");
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), ReminderError> {
        let http = self
            .current_http()
            .ok_or_else(|| ReminderError::Connectivity("no active session".to_string()))?;

        let user_id: u64 = recipient_id.parse().map_err(|_| {
            ReminderError::Transport(format!("{recipient_id} is not a Discord user id"))
        })?;

        let channel = UserId(user_id)
            .create_dm_channel(&*http)
            .await
            .map_err(|e| ReminderError::Transport(e.to_string()))?;

        for chunk in chunk_for_message(text) {
            channel
                .id
                .say(&*http, chunk)
                .await
                .map_err(|e| ReminderError::Transport(e.to_string()))?;
        }
        Ok(())
    }
}

/// Serenity event handler that forwards gateway activity as [`InboundEvent`]s.
struct GatewayRelay {
    inbound: mpsc::UnboundedSender<InboundEvent>,
    connected: Arc<watch::Sender<bool>>,
}

impl GatewayRelay {
    fn forward(&self, event: InboundEvent) {
        if self.inbound.send(event).is_err() {
            debug!("Inbound receiver closed, dropping gateway event");
        }
    }
}

#[async_trait]
impl EventHandler for GatewayRelay {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected and ready", ready.user.name);
        self.connected.send_replace(true);
        self.forward(InboundEvent::Connected);
    }

    async fn resume(&self, _ctx: Context, _resumed: ResumedEvent) {
        info!("Gateway session resumed");
        self.connected.send_replace(true);
        self.forward(InboundEvent::Connected);
    }

    async fn shard_stage_update(&self, _ctx: Context, update: ShardStageUpdateEvent) {
        debug!(
            "Shard {:?} stage {:?} -> {:?}",
            update.shard_id, update.old, update.new
        );
        match (update.old, update.new) {
            (_, ConnectionStage::Disconnected) => {
                if self.connected.send_replace(false) {
                    warn!("Gateway connection dropped");
                    self.forward(InboundEvent::Disconnected);
                }
            }
            // resume refused: the old session is gone and a new identity handshake starts
            (ConnectionStage::Resuming, ConnectionStage::Identifying) => {
                warn!("Gateway session invalidated, stream replaced");
                self.connected.send_replace(false);
                self.forward(InboundEvent::StreamReplaced);
            }
            _ => {}
        }
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        // direct messages from people only
        if msg.author.bot || msg.guild_id.is_some() {
            return;
        }
        self.forward(InboundEvent::Message {
            sender: msg.author.id.to_string(),
            text: msg.content,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_silent_gateway_is_a_connect_failure() {
        let (_state, ready) = watch::channel(false);
        let (_runner, exited) = oneshot::channel::<String>();

        let started = tokio::time::Instant::now();
        let err = await_ready(ready, exited, READY_TIMEOUT).await.unwrap_err();

        assert!(matches!(err, ReminderError::Connectivity(_)));
        assert!(started.elapsed() >= READY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_runner_exit_before_ready_fails_with_its_reason() {
        let (_state, ready) = watch::channel(false);
        let (runner, exited) = oneshot::channel();
        runner.send("invalid token".to_string()).unwrap();

        let err = await_ready(ready, exited, READY_TIMEOUT).await.unwrap_err();
        assert_eq!(err, ReminderError::Connectivity("invalid token".to_string()));
    }

    #[tokio::test]
    async fn test_ready_signal_completes_connect() {
        let (state, ready) = watch::channel(false);
        let (_runner, exited) = oneshot::channel::<String>();

        let waiter = tokio::spawn(await_ready(ready, exited, READY_TIMEOUT));
        state.send_replace(true);

        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_without_session_returns() {
        let (inbound, _rx) = mpsc::unbounded_channel();
        let transport = DiscordTransport::new("token", inbound);

        transport.disconnect().await;

        assert!(!transport.is_connected());
        assert!(transport.current_http().is_none());
    }

    #[tokio::test]
    async fn test_send_without_session_is_connectivity_error() {
        let (inbound, _rx) = mpsc::unbounded_channel();
        let transport = DiscordTransport::new("token", inbound);

        let err = transport.send("1234", "halo").await.unwrap_err();
        assert!(matches!(err, ReminderError::Connectivity(_)));
    }
}
