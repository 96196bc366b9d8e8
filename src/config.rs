use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

/// Where the ledger key lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    File,
    Memory, // nothing survives a restart
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub data_dir: PathBuf,
    pub estimator_delay: Duration,
    pub estimate_timeout: Duration,
    pub utc_offset: UtcOffset, // day boundary used for all bucketing
}

impl AppConfig {
    /// `local_offset` is used when `MEAL_UTC_OFFSET` is unset.
    pub fn from_env(local_offset: UtcOffset) -> anyhow::Result<Self> {
        let utc_offset = match std::env::var("MEAL_UTC_OFFSET") {
            Ok(v) => parse_offset(&v).with_context(|| format!("MEAL_UTC_OFFSET={v}"))?,
            Err(_) => local_offset,
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            store: match std::env::var("MEAL_STORE").as_deref() {
                Ok("memory") => StoreKind::Memory,
                Ok("file") | Err(_) => StoreKind::File,
                Ok(other) => anyhow::bail!("MEAL_STORE must be file or memory, got {other}"),
            },
            data_dir: std::env::var("MEAL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            estimator_delay: Duration::from_millis(
                std::env::var("ESTIMATOR_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1800),
            ),
            estimate_timeout: Duration::from_secs(
                std::env::var("ESTIMATE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(30),
            ),
            utc_offset,
        })
    }

    /// Current calendar day in the configured offset.
    pub fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.utc_offset).date()
    }
}

/// Parses `Z`, `+HH:MM` or `-HH:MM`.
pub fn parse_offset(s: &str) -> anyhow::Result<UtcOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    let fmt = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    UtcOffset::parse(s, fmt).context("expected Z or +HH:MM")
}
