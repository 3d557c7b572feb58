//! Error taxonomy for the reminder subsystem
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.0.0: Initial taxonomy (format, validation, persistence, transport, connectivity)

use thiserror::Error;

/// Failures surfaced by the store, the interpreter and the delivery path.
///
/// Only `Format` and `Validation` carry text meant for the sender. The rest are
/// logged with detail and replaced by a generic reply (or no reply at all).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// Command text does not have the three-line `Tanggal/Notifikasi/Keterangan` shape.
    #[error("malformed command: {0}")]
    Format(String),

    /// Date or time has the wrong syntax, is not a real calendar value, or lies in the past.
    #[error("invalid event: {0}")]
    Validation(String),

    /// Backing store could not be opened, queried or written.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// A single send to a recipient failed.
    #[error("send failed: {0}")]
    Transport(String),

    /// The transport session is down.
    #[error("transport not connected: {0}")]
    Connectivity(String),
}

impl ReminderError {
    /// Reply text shown to the sender of the command that caused this error.
    pub fn user_message(&self) -> String {
        match self {
            ReminderError::Format(reason) => format!("Format pesan tidak sesuai: {reason}"),
            ReminderError::Validation(reason) => reason.clone(),
            ReminderError::Persistence(_) => {
                "Gagal menyimpan acara, silakan coba lagi nanti".to_string()
            }
            ReminderError::Transport(_) | ReminderError::Connectivity(_) => {
                "Pesan tidak dapat dikirim saat ini".to_string()
            }
        }
    }
}

impl From<sqlite::Error> for ReminderError {
    fn from(err: sqlite::Error) -> Self {
        ReminderError::Persistence(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ReminderError {
    fn from(err: tokio::task::JoinError) -> Self {
        ReminderError::Persistence(format!("store task aborted: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_passed_through() {
        let err = ReminderError::Validation("Tanggal acara tidak boleh sebelum hari ini".into());
        assert_eq!(err.user_message(), "Tanggal acara tidak boleh sebelum hari ini");
    }

    #[test]
    fn test_persistence_detail_is_hidden_from_sender() {
        let err = ReminderError::Persistence("disk I/O error at /var/db".into());
        assert!(!err.user_message().contains("/var/db"));
        assert!(err.to_string().contains("/var/db"));
    }

    #[test]
    fn test_format_message_mentions_reason() {
        let err = ReminderError::Format("kurang data".into());
        assert!(err.user_message().contains("kurang data"));
    }
}
