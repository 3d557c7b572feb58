//! Sliding-window limiter for assistant pass-through queries
//!
//! Reminder commands are never limited; only free text that would reach the
//! generative backend is counted. Senders are bucketed by their canonical
//! recipient id, so every address form of one person shares a window.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::transport::canonical_recipient;

pub struct RateLimiter {
    /// Admission times per canonical sender, oldest first
    admitted: DashMap<String, Vec<Instant>>,
    max_queries: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_queries: usize, window: Duration) -> Self {
        RateLimiter {
            admitted: DashMap::new(),
            max_queries,
            window,
        }
    }

    /// Admit one query from `sender`.
    ///
    /// When the sender is over the limit nothing is recorded and the error holds
    /// how long until the oldest query in the window expires.
    pub fn admit(&self, sender: &str) -> Result<(), Duration> {
        self.admit_at(&canonical_recipient(sender), Instant::now())
    }

    fn admit_at(&self, sender: &str, now: Instant) -> Result<(), Duration> {
        let mut history = self.admitted.entry(sender.to_string()).or_default();
        history.retain(|&at| now.saturating_duration_since(at) < self.window);

        if history.len() < self.max_queries {
            history.push(now);
            return Ok(());
        }

        let oldest = history.first().copied().unwrap_or(now);
        Err(self.window.saturating_sub(now.saturating_duration_since(oldest)))
    }
}
