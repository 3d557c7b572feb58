//! In-memory transport for tests

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::Transport;
use crate::core::error::ReminderError;

#[derive(Default)]
pub(crate) struct MockTransport {
    connected: AtomicBool,
    remaining_failures: AtomicUsize,
    connect_delay: Duration,
    failing: HashSet<String>,
    attempts: Mutex<Vec<Instant>>,
    disconnects: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub(crate) fn connected() -> Self {
        let transport = Self::default();
        transport.connected.store(true, Ordering::SeqCst);
        transport
    }

    pub(crate) fn disconnected() -> Self {
        Self::default()
    }

    /// Fail the next `count` connect attempts.
    pub(crate) fn failing_connects(self, count: usize) -> Self {
        self.remaining_failures.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Reject every send to `recipient`.
    pub(crate) fn failing_for(mut self, recipient: &str) -> Self {
        self.failing.insert(recipient.to_string());
        self
    }

    pub(crate) fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub(crate) fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<(), ReminderError> {
        self.attempts.lock().unwrap().push(Instant::now());
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }

        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ReminderError::Connectivity("mock refused".to_string()));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), ReminderError> {
        if self.failing.contains(recipient_id) {
            return Err(ReminderError::Transport(format!("{recipient_id} unreachable")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), text.to_string()));
        Ok(())
    }
}
