//! Civil calendar handling
//!
//! Reminders are keyed by the wall-clock date and minute of one fixed time zone.
//! Keys are stored and matched as formatted strings, so this module owns the two
//! formats and the validation that guards every insert.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::error::ReminderError;

/// `DD-MM-YYYY`
pub const DATE_FORMAT: &str = "%d-%m-%Y";
/// `HH:MM`, 24-hour
pub const TIME_FORMAT: &str = "%H:%M";

/// Western Indonesia Time, no daylight saving
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
static TIME_SHAPE: OnceLock<Regex> = OnceLock::new();

fn date_shape() -> &'static Regex {
    DATE_SHAPE.get_or_init(|| Regex::new(r"^\d{2}-\d{2}-\d{4}$").expect("static regex"))
}

fn time_shape() -> &'static Regex {
    TIME_SHAPE.get_or_init(|| Regex::new(r"^\d{2}:\d{2}$").expect("static regex"))
}

/// Source of "now" in the civil calendar.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock pinned to a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        SystemClock { offset }
    }

    /// Build from a whole-hour offset such as `7` for UTC+07:00.
    pub fn from_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(Self::new)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        // 7h is always within chrono's accepted range
        Self::from_hours(DEFAULT_UTC_OFFSET_HOURS).unwrap_or_else(|| Self::new(Utc.fix()))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Clock that always reports the same instant. Used to drive ticks deterministically.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Parse an RFC 3339 timestamp, e.g. `2099-01-01T09:00:00+07:00`.
    pub fn parse(rfc3339: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(rfc3339).ok().map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Date and minute keys for one instant in the civil calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CivilStamp {
    pub date: String,
    pub time: String,
}

impl From<DateTime<FixedOffset>> for CivilStamp {
    fn from(now: DateTime<FixedOffset>) -> Self {
        CivilStamp {
            date: now.format(DATE_FORMAT).to_string(),
            time: now.format(TIME_FORMAT).to_string(),
        }
    }
}

/// Check that `date` is a real `DD-MM-YYYY` date no earlier than `today`.
pub fn validate_date(date: &str, today: NaiveDate) -> Result<NaiveDate, ReminderError> {
    if !date_shape().is_match(date) {
        return Err(ReminderError::Validation(format!(
            "Tanggal tidak valid: {date} (gunakan format DD-MM-YYYY)"
        )));
    }

    let parsed = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|e| {
        ReminderError::Validation(format!("Tanggal tidak valid: {date} ({e})"))
    })?;

    // yesterday and earlier are rejected, today is fine
    if parsed < today {
        return Err(ReminderError::Validation(
            "Tanggal acara tidak boleh sebelum hari ini".to_string(),
        ));
    }

    Ok(parsed)
}

/// Check that `time` is a real `HH:MM` 24-hour time.
pub fn validate_time(time: &str) -> Result<NaiveTime, ReminderError> {
    if !time_shape().is_match(time) {
        return Err(ReminderError::Validation(format!(
            "Waktu notifikasi tidak valid: {time} (gunakan format HH:MM)"
        )));
    }

    NaiveTime::parse_from_str(time, TIME_FORMAT)
        .map_err(|e| ReminderError::Validation(format!("Waktu notifikasi tidak valid: {time} ({e})")))
}
