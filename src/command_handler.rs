//! # Command Interpreter
//!
//! Turns an inbound text message into a reply. Three shapes are recognised:
//! the `/set` help token, the `/list` token, and the three-line event form
//!
//! ```text
//! Tanggal: DD-MM-YYYY
//! Notifikasi: HH:MM
//! Keterangan: free text
//! ```
//!
//! Everything else is passed to the assistant and its answer relayed verbatim.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::core::error::ReminderError;
use crate::database::{Database, Event};
use crate::features::assistant::Assistant;
use crate::features::rate_limiting::RateLimiter;
use crate::transport::{canonical_recipient, DeliveryGateway};

pub const HELP_COMMAND: &str = "/set";
pub const LIST_COMMAND: &str = "/list";

pub const HELP_TEXT: &str = "Silahkan masukan format seperti berikut:\nTanggal: DD-MM-YYYY\nNotifikasi: HH:MM\nKeterangan: Isi Keterangan Acara\n\nKetik /list untuk melihat acara yang tersimpan.";

const DATE_LABEL: &str = "Tanggal:";
const TIME_LABEL: &str = "Notifikasi:";
const NOTE_LABEL: &str = "Keterangan:";

/// Event fields as typed by the user, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub date: String,
    pub time: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    CreateEvent(EventDraft),
    Query(String),
}

/// Classify a message. Only text that starts like the event form can fail.
pub fn parse_command(text: &str) -> Result<Command, ReminderError> {
    let text = text.trim();
    match text {
        HELP_COMMAND => Ok(Command::Help),
        LIST_COMMAND => Ok(Command::List),
        _ if text.starts_with(DATE_LABEL) => parse_event(text).map(Command::CreateEvent),
        _ => Ok(Command::Query(text.to_string())),
    }
}

/// Parse the three-line event form.
pub fn parse_event(text: &str) -> Result<EventDraft, ReminderError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() != 3 {
        return Err(ReminderError::Format(format!(
            "harus tepat 3 baris, ditemukan {}",
            lines.len()
        )));
    }

    let mut date = None;
    let mut time = None;
    let mut note = None;

    for line in lines {
        let line = line.trim();
        let slot = if let Some(value) = line.strip_prefix(DATE_LABEL) {
            (&mut date, value)
        } else if let Some(value) = line.strip_prefix(TIME_LABEL) {
            (&mut time, value)
        } else if let Some(value) = line.strip_prefix(NOTE_LABEL) {
            (&mut note, value)
        } else {
            return Err(ReminderError::Format(format!("baris tidak dikenal: {line}")));
        };

        let (field, value) = slot;
        if field.is_some() {
            return Err(ReminderError::Format(format!("baris ganda: {line}")));
        }
        *field = Some(value.trim().to_string());
    }

    match (date, time, note) {
        (Some(date), Some(time), Some(note))
            if !date.is_empty() && !time.is_empty() && !note.is_empty() =>
        {
            Ok(EventDraft { date, time, note })
        }
        _ => Err(ReminderError::Format("kurang data".to_string())),
    }
}

pub struct CommandHandler {
    database: Database,
    gateway: DeliveryGateway,
    assistant: Arc<dyn Assistant>,
    rate_limiter: RateLimiter,
}

impl CommandHandler {
    pub fn new(
        database: Database,
        gateway: DeliveryGateway,
        assistant: Arc<dyn Assistant>,
        rate_limiter: RateLimiter,
    ) -> Self {
        CommandHandler {
            database,
            gateway,
            assistant,
            rate_limiter,
        }
    }

    /// Handle one inbound message and send the reply, if any.
    pub async fn handle_message(&self, sender: &str, text: &str) {
        let sender = canonical_recipient(sender);
        if let Some(reply) = self.respond(&sender, text).await {
            self.gateway.reply(&sender, &reply).await;
        }
    }

    /// Compute the reply for a message without sending it.
    pub async fn respond(&self, sender: &str, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        let command = match parse_command(text) {
            Ok(command) => command,
            Err(e) => {
                debug!("Rejected command from {sender}: {e}");
                return Some(format!("{}\n\n{HELP_TEXT}", e.user_message()));
            }
        };

        let reply = match command {
            Command::Help => HELP_TEXT.to_string(),
            Command::List => self.list_events(sender).await,
            Command::CreateEvent(draft) => self.create_event(sender, draft).await,
            Command::Query(prompt) => self.ask_assistant(sender, &prompt).await,
        };
        Some(reply)
    }

    async fn create_event(&self, sender: &str, draft: EventDraft) -> String {
        let event = Event::new(sender, draft.date, draft.time, draft.note);
        match self.database.insert_event(&event).await {
            Ok(()) => format!(
                "Acara berhasil disimpan\nTanggal: {}\nNotifikasi: {}",
                event.date, event.time
            ),
            Err(e @ ReminderError::Persistence(_)) => {
                error!("Failed to store event for {sender}: {e}");
                e.user_message()
            }
            Err(e) => {
                info!("Event from {sender} rejected: {e}");
                e.user_message()
            }
        }
    }

    async fn list_events(&self, sender: &str) -> String {
        match self.database.events_for(sender).await {
            Ok(events) if events.is_empty() => "Belum ada acara yang tersimpan.".to_string(),
            Ok(events) => {
                let mut list = String::from("Acara tersimpan:");
                for (i, event) in events.iter().enumerate() {
                    list.push_str(&format!(
                        "\n{}. {} {} - {}",
                        i + 1,
                        event.date,
                        event.time,
                        event.note
                    ));
                }
                list
            }
            Err(e) => {
                error!("Failed to list events for {sender}: {e}");
                "Gagal mengambil daftar acara, silakan coba lagi nanti".to_string()
            }
        }
    }

    async fn ask_assistant(&self, sender: &str, prompt: &str) -> String {
        if let Err(wait) = self.rate_limiter.admit(sender) {
            warn!("Assistant rate limit hit for {sender}, {wait:?} left");
            return format!(
                "Terlalu banyak pertanyaan, coba lagi dalam {} detik.",
                wait.as_secs().max(1)
            );
        }

        match self.assistant.complete(prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Error sending message to assistant: {e}");
                "Maaf, asisten sedang tidak tersedia.".to_string()
            }
        }
    }
}
