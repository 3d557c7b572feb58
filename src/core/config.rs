//! Process configuration
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{anyhow, Context, Result};
use std::time::Duration;

use super::civil::DEFAULT_UTC_OFFSET_HOURS;

/// Longest scheduler period that still visits every minute slot
const MAX_TICK_SECONDS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub database_path: String,
    pub log_level: String,
    /// Scheduler period
    pub tick_interval: Duration,
    /// Offset of the civil calendar reminders are keyed in
    pub utc_offset_hours: i32,
    pub assistant_max_requests: usize,
    pub assistant_window: Duration,
}

impl Config {
    /// Read configuration from the process environment (call `dotenv()` first).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token =
            get("DISCORD_TOKEN").ok_or_else(|| anyhow!("DISCORD_TOKEN must be set"))?;
        let openai_api_key = get("OPENAI_API_KEY")
            .or_else(|| get("API_KEY"))
            .ok_or_else(|| anyhow!("OPENAI_API_KEY (or API_KEY) must be set"))?;

        let tick_seconds: u64 = parse_or(&get, "REMINDER_TICK_SECONDS", 5)?;
        if !(1..=MAX_TICK_SECONDS).contains(&tick_seconds) {
            return Err(anyhow!(
                "REMINDER_TICK_SECONDS must be between 1 and {MAX_TICK_SECONDS}, got {tick_seconds}"
            ));
        }

        let utc_offset_hours: i32 =
            parse_or(&get, "REMINDER_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(anyhow!(
                "REMINDER_UTC_OFFSET_HOURS must be between -12 and 14, got {utc_offset_hours}"
            ));
        }

        let assistant_max_requests: usize = parse_or(&get, "ASSISTANT_MAX_REQUESTS", 10)?;
        let assistant_window_seconds: u64 = parse_or(&get, "ASSISTANT_WINDOW_SECONDS", 60)?;

        Ok(Config {
            discord_token,
            openai_api_key,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "pengingat.db".to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            tick_interval: Duration::from_secs(tick_seconds),
            utc_offset_hours,
            assistant_max_requests,
            assistant_window: Duration::from_secs(assistant_window_seconds),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
