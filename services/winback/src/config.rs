use anyhow::{Context, bail};
use chrono::Duration;

use crate::domain::types::WinbackSettings;

/// Winback service configuration loaded from environment variables.
#[derive(Debug)]
pub struct WinbackConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port for the HTTP server (default 3114). Env var: `WINBACK_PORT`.
    pub winback_port: u16,
    /// Endpoint of the email integration that delivers outbound messages.
    pub email_send_url: String,
    /// Bearer secret expected on `POST /winback/run`. Unset disables the check.
    pub cron_secret: Option<String>,
    pub batch_size: u64,
    /// `WINBACK_REVIEW_DELAY_DAYS`.
    pub review_delay: Duration,
    /// `WINBACK_ENGAGEMENT_WINDOW_DAYS`.
    pub engagement_window: Duration,
    pub engaging_bonus: i32,
    pub irrecoverable_penalty: i32,
}

impl WinbackConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = WinbackSettings::default();
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL")?,
            winback_port: env_or("WINBACK_PORT", 3114),
            email_send_url: std::env::var("EMAIL_SEND_URL").context("EMAIL_SEND_URL")?,
            cron_secret: std::env::var("WINBACK_CRON_SECRET")
                .ok()
                .filter(|v| !v.is_empty()),
            batch_size: env_or("WINBACK_BATCH_SIZE", defaults.batch_size),
            review_delay: days_setting(
                "WINBACK_REVIEW_DELAY_DAYS",
                std::env::var("WINBACK_REVIEW_DELAY_DAYS").ok(),
                defaults.review_delay,
            )?,
            engagement_window: days_setting(
                "WINBACK_ENGAGEMENT_WINDOW_DAYS",
                std::env::var("WINBACK_ENGAGEMENT_WINDOW_DAYS").ok(),
                defaults.engagement_window,
            )?,
            engaging_bonus: env_or("WINBACK_ENGAGING_BONUS", defaults.engaging_bonus),
            irrecoverable_penalty: env_or(
                "WINBACK_IRRECOVERABLE_PENALTY",
                defaults.irrecoverable_penalty,
            ),
        })
    }

    pub fn settings(&self) -> WinbackSettings {
        WinbackSettings {
            batch_size: self.batch_size.max(1),
            review_delay: self.review_delay,
            engagement_window: self.engagement_window,
            engaging_bonus: self.engaging_bonus,
            irrecoverable_penalty: self.irrecoverable_penalty,
            ..WinbackSettings::default()
        }
    }
}

/// Longest accepted day-based setting.
const MAX_SETTING_DAYS: i64 = 3650;

/// Parse a whole-day setting. Unset keeps `default`; anything that is not a
/// day count in `0..=MAX_SETTING_DAYS` is rejected.
fn days_setting(key: &str, raw: Option<String>, default: Duration) -> anyhow::Result<Duration> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let days: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of days, got `{raw}`"))?;
    if !(0..=MAX_SETTING_DAYS).contains(&days) {
        bail!("{key} must be between 0 and {MAX_SETTING_DAYS} days, got {days}");
    }
    Duration::try_days(days).with_context(|| format!("{key} is out of range"))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
