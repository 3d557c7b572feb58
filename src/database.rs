//! # Event Store
//!
//! Durable table of pending reminders keyed by `(date, time)` strings.
//!
//! The store holds only a path. Every operation opens its own connection on the
//! blocking pool, so the interpreter (insert) and the scheduler (query + delete)
//! rely on SQLite's own locking and never share a handle across ticks.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use log::{debug, info};
use sqlite::{Connection, State};
use std::sync::Arc;

use crate::core::civil::{validate_date, validate_time, Clock};
use crate::core::error::ReminderError;
use crate::transport::canonical_recipient;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient_id TEXT NOT NULL,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    note TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_due ON events (date, time);";

/// Milliseconds a statement waits on a locked database before failing
const BUSY_TIMEOUT_MS: usize = 5_000;

/// One pending reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Canonical recipient handle (local part only)
    pub recipient_id: String,
    /// `DD-MM-YYYY`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    /// Delivered verbatim
    pub note: String,
}

impl Event {
    pub fn new(
        recipient_id: impl AsRef<str>,
        date: impl Into<String>,
        time: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Event {
            recipient_id: canonical_recipient(recipient_id.as_ref()),
            date: date.into(),
            time: time.into(),
            note: note.into(),
        }
    }
}

#[derive(Clone)]
pub struct Database {
    path: Arc<str>,
    clock: Arc<dyn Clock>,
}

impl Database {
    /// Open the store at `path`, creating the schema if needed.
    ///
    /// `clock` decides what "today" is when inserts are validated.
    pub async fn new(path: &str, clock: Arc<dyn Clock>) -> Result<Self, ReminderError> {
        let database = Database {
            path: Arc::from(path),
            clock,
        };

        database.with_connection(|_| Ok(())).await?;
        info!("Event store ready at {path}");
        Ok(database)
    }

    /// Run `op` against a fresh connection on the blocking pool.
    async fn with_connection<T, F>(&self, op: F) -> Result<T, ReminderError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, ReminderError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<T, ReminderError> {
            let mut connection = sqlite::open(&*path)?;
            connection.set_busy_timeout(BUSY_TIMEOUT_MS)?;
            connection.execute(SCHEMA)?;
            op(&connection)
        })
        .await?
    }

    /// Validate and persist a new event.
    pub async fn insert_event(&self, event: &Event) -> Result<(), ReminderError> {
        validate_date(&event.date, self.clock.today())?;
        validate_time(&event.time)?;

        let event = Event {
            recipient_id: canonical_recipient(&event.recipient_id),
            ..event.clone()
        };
        if event.recipient_id.is_empty() {
            return Err(ReminderError::Validation(
                "Penerima acara tidak dikenal".to_string(),
            ));
        }

        let logged = event.clone();
        self.with_connection(move |conn| {
            let mut statement = conn.prepare(
                "INSERT INTO events (recipient_id, date, time, note) VALUES (?, ?, ?, ?)",
            )?;
            statement.bind((1, event.recipient_id.as_str()))?;
            statement.bind((2, event.date.as_str()))?;
            statement.bind((3, event.time.as_str()))?;
            statement.bind((4, event.note.as_str()))?;
            while statement.next()? != State::Done {}
            Ok(())
        })
        .await?;

        info!(
            "Event saved for {} at {} {}",
            logged.recipient_id, logged.date, logged.time
        );
        Ok(())
    }

    /// All events whose stored date and time equal the given keys exactly.
    pub async fn due_events(&self, date: &str, time: &str) -> Result<Vec<Event>, ReminderError> {
        let (date, time) = (date.to_string(), time.to_string());
        self.with_connection(move |conn| {
            let mut statement = conn.prepare(
                "SELECT recipient_id, date, time, note FROM events WHERE date = ? AND time = ?",
            )?;
            statement.bind((1, date.as_str()))?;
            statement.bind((2, time.as_str()))?;
            read_events(&mut statement)
        })
        .await
    }

    /// Remove every event at exactly `(date, time)`. Returns the number removed.
    pub async fn delete_due(&self, date: &str, time: &str) -> Result<usize, ReminderError> {
        let (date, time) = (date.to_string(), time.to_string());
        let deleted = self
            .with_connection(move |conn| {
                let mut statement =
                    conn.prepare("DELETE FROM events WHERE date = ? AND time = ?")?;
                statement.bind((1, date.as_str()))?;
                statement.bind((2, time.as_str()))?;
                while statement.next()? != State::Done {}
                Ok(conn.change_count())
            })
            .await?;

        debug!("Deleted {deleted} due event(s)");
        Ok(deleted)
    }

    /// Pending events for one recipient, oldest first.
    pub async fn events_for(&self, recipient_id: &str) -> Result<Vec<Event>, ReminderError> {
        let recipient_id = canonical_recipient(recipient_id);
        self.with_connection(move |conn| {
            let mut statement = conn.prepare(
                "SELECT recipient_id, date, time, note FROM events WHERE recipient_id = ? ORDER BY id",
            )?;
            statement.bind((1, recipient_id.as_str()))?;
            read_events(&mut statement)
        })
        .await
    }
}

fn read_events(statement: &mut sqlite::Statement<'_>) -> Result<Vec<Event>, ReminderError> {
    let mut events = Vec::new();
    while let State::Row = statement.next()? {
        events.push(Event {
            recipient_id: statement.read::<String, _>("recipient_id")?,
            date: statement.read::<String, _>("date")?,
            time: statement.read::<String, _>("time")?,
            note: statement.read::<String, _>("note")?,
        });
    }
    Ok(events)
}
