//! Connection Supervisor
//!
//! Keeps one transport session alive. Every check-and-reconnect sequence runs
//! under a single async mutex that also owns the backoff state, so concurrent
//! callers queue behind the attempt in flight instead of starting their own.
//! Fire-and-forget triggers go through a small channel to one actor task.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};

use crate::transport::Transport;

/// First retry delay, and the value restored after a successful connect
pub const BACKOFF_FLOOR: Duration = Duration::from_secs(1);
/// Upper bound on the retry delay
pub const BACKOFF_CEILING: Duration = Duration::from_secs(300);

/// Pending reconnect requests beyond this are coalesced (dropped)
const TRIGGER_CAPACITY: usize = 4;

/// Exponential backoff: floor, doubling, capped at the ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    floor: Duration,
    ceiling: Duration,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Backoff {
            current: floor,
            floor,
            ceiling,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Delay to wait now; doubles the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.ceiling);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(BACKOFF_FLOOR, BACKOFF_CEILING)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Why a reconnect was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectReason {
    /// Transport reported the session dropped
    Dropped,
    /// Another session took over; tear down and start fresh
    StreamReplaced,
    /// Scheduler found the transport down before a tick
    TickSkipped,
}

struct Inner {
    transport: Arc<dyn Transport>,
    backoff: Mutex<Backoff>,
    state: watch::Sender<ConnectionState>,
}

impl Inner {
    async fn ensure_connected(&self, fresh: bool) {
        let mut backoff = self.backoff.lock().await;

        if fresh {
            info!("Stream replaced, dropping current session before reconnecting");
            self.transport.disconnect().await;
            self.state.send_replace(ConnectionState::Disconnected);
        }

        loop {
            if self.transport.is_connected() {
                self.state.send_replace(ConnectionState::Connected);
                return;
            }

            self.state.send_replace(ConnectionState::Connecting);
            info!("Transport disconnected. Attempting to reconnect...");

            match self.transport.connect().await {
                Ok(()) => {
                    backoff.reset();
                    self.state.send_replace(ConnectionState::Connected);
                    info!("Successfully reconnected");
                    return;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    self.state.send_replace(ConnectionState::Disconnected);
                    warn!("Failed to reconnect: {e}. Retrying in {delay:?}...");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Handle to the single supervisor instance. Cheap to clone.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<Inner>,
    triggers: mpsc::Sender<ReconnectReason>,
}

impl ConnectionSupervisor {
    /// Create the supervisor and start its actor task.
    pub fn spawn(transport: Arc<dyn Transport>) -> Self {
        Self::spawn_with_backoff(transport, Backoff::default())
    }

    pub fn spawn_with_backoff(transport: Arc<dyn Transport>, backoff: Backoff) -> Self {
        let initial = if transport.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        let (state, _) = watch::channel(initial);
        let inner = Arc::new(Inner {
            transport,
            backoff: Mutex::new(backoff),
            state,
        });

        let (triggers, mut requests) = mpsc::channel(TRIGGER_CAPACITY);
        let actor = inner.clone();
        tokio::spawn(async move {
            while let Some(reason) = requests.recv().await {
                debug!("Reconnect requested: {reason:?}");
                actor
                    .ensure_connected(reason == ReconnectReason::StreamReplaced)
                    .await;
            }
            debug!("Connection supervisor stopped");
        });

        ConnectionSupervisor { inner, triggers }
    }

    /// Block until the transport is connected, retrying with backoff.
    ///
    /// Returns immediately when already connected.
    pub async fn ensure_connected(&self) {
        self.inner.ensure_connected(false).await;
    }

    /// Ask the actor to reconnect without waiting for it.
    pub fn request_reconnect(&self, reason: ReconnectReason) {
        match self.triggers.try_send(reason) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Reconnect already pending, coalescing {reason:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Connection supervisor is gone, cannot handle {reason:?}");
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    /// Record a session established outside the supervisor (e.g. a gateway resume).
    pub fn mark_connected(&self) {
        self.inner.state.send_replace(ConnectionState::Connected);
    }

    /// Record an externally observed drop.
    pub fn mark_disconnected(&self) {
        self.inner
            .state
            .send_replace(ConnectionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    async fn eventually<F: Fn() -> bool>(check: F) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = (0..12).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(
            delays,
            vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 300, 300, 300]
        );

        backoff.reset();
        assert_eq!(backoff.current(), BACKOFF_FLOOR);
    }

    #[test]
    fn test_backoff_never_exceeds_ceiling() {
        let mut backoff = Backoff::default();
        for _ in 0..1_000 {
            assert!(backoff.next_delay() <= BACKOFF_CEILING);
        }
    }

    #[tokio::test]
    async fn test_fast_path_when_connected() {
        let transport = Arc::new(MockTransport::connected());
        let supervisor = ConnectionSupervisor::spawn(transport.clone());

        supervisor.ensure_connected().await;

        assert!(transport.attempts().is_empty());
        assert_eq!(supervisor.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delays_follow_backoff() {
        let transport = Arc::new(MockTransport::disconnected().failing_connects(10));
        let supervisor = ConnectionSupervisor::spawn(transport.clone());

        supervisor.ensure_connected().await;

        let attempts = transport.attempts();
        assert_eq!(attempts.len(), 11);
        let gaps: Vec<u64> = attempts
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_secs())
            .collect();
        assert_eq!(gaps, vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 300]);
        assert_eq!(supervisor.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_backoff() {
        let transport = Arc::new(MockTransport::disconnected().failing_connects(3));
        let supervisor = ConnectionSupervisor::spawn(transport.clone());
        supervisor.ensure_connected().await;

        assert_eq!(supervisor.inner.backoff.lock().await.current(), BACKOFF_FLOOR);
    }

    #[tokio::test]
    async fn test_concurrent_callers_serialize() {
        let transport = Arc::new(
            MockTransport::disconnected().with_connect_delay(Duration::from_millis(50)),
        );
        let supervisor = ConnectionSupervisor::spawn(transport.clone());

        let first = supervisor.clone();
        let second = supervisor.clone();
        tokio::join!(first.ensure_connected(), second.ensure_connected());

        assert_eq!(transport.attempts().len(), 1);
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_dropped_trigger_reconnects() {
        let transport = Arc::new(MockTransport::connected());
        let supervisor = ConnectionSupervisor::spawn(transport.clone());

        transport.drop_connection();
        supervisor.mark_disconnected();
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
        supervisor.request_reconnect(ReconnectReason::Dropped);

        eventually(|| transport.is_connected()).await;
        assert_eq!(transport.attempts().len(), 1);
        eventually(|| supervisor.state() == ConnectionState::Connected).await;
    }

    #[tokio::test]
    async fn test_stream_replaced_reconnects_fresh() {
        let transport = Arc::new(MockTransport::connected());
        let supervisor = ConnectionSupervisor::spawn(transport.clone());

        supervisor.request_reconnect(ReconnectReason::StreamReplaced);

        eventually(|| transport.disconnects() == 1 && transport.is_connected()).await;
        assert_eq!(transport.attempts().len(), 1);
    }
}
