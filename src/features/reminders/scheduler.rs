//! Reminder Scheduler
//!
//! Periodic tick that delivers every event whose `(date, time)` key equals the
//! current civil date and minute, then retires those rows. Delivery is at most
//! once per slot: rows are deleted after the batch whether or not each send
//! succeeded.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::core::civil::{CivilStamp, Clock};
use crate::core::error::ReminderError;
use crate::database::Database;
use crate::features::connection::{ConnectionSupervisor, ReconnectReason};
use crate::transport::DeliveryGateway;

/// Default scheduler period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Reminder text sent to the recipient.
pub fn format_reminder(note: &str) -> String {
    format!("Pengingat Acara:\nKeterangan: {note}")
}

/// Outcome of one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Transport was down; nothing was read or sent
    pub skipped: bool,
    pub due: usize,
    pub delivered: usize,
    pub failed: usize,
    pub deleted: usize,
}

pub struct ReminderScheduler {
    database: Database,
    gateway: DeliveryGateway,
    supervisor: ConnectionSupervisor,
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl ReminderScheduler {
    pub fn new(
        database: Database,
        gateway: DeliveryGateway,
        supervisor: ConnectionSupervisor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ReminderScheduler {
            database,
            gateway,
            supervisor,
            clock,
            period: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Tick forever. A failed tick is logged and the next one runs normally.
    pub async fn run(self) {
        info!("Reminder scheduler started (every {:?})", self.period);
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.tick().await {
                Ok(report) if report.due > 0 => info!(
                    "Reminder tick: {} due, {} delivered, {} failed, {} removed",
                    report.due, report.delivered, report.failed, report.deleted
                ),
                Ok(_) => {}
                Err(e) => error!("Reminder tick aborted: {e}"),
            }
        }
    }

    /// Run one check-deliver-retire cycle.
    pub async fn tick(&self) -> Result<TickReport, ReminderError> {
        if !self.gateway.is_connected() {
            debug!("Transport is not connected. Skipping reminder check.");
            self.supervisor.request_reconnect(ReconnectReason::TickSkipped);
            return Ok(TickReport {
                skipped: true,
                ..TickReport::default()
            });
        }

        let now = CivilStamp::from(self.clock.now());
        debug!("Checking reminders for date: {}, time: {}", now.date, now.time);

        let due = self.database.due_events(&now.date, &now.time).await?;
        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };
        if due.is_empty() {
            return Ok(report);
        }

        for event in &due {
            let text = format_reminder(&event.note);
            match self.gateway.send(&event.recipient_id, &text).await {
                Ok(()) => {
                    report.delivered += 1;
                    info!("Reminder sent successfully to {}", event.recipient_id);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Error sending reminder to {}: {e}", event.recipient_id);
                }
            }
        }

        report.deleted = self.database.delete_due(&now.date, &now.time).await?;
        Ok(report)
    }
}
