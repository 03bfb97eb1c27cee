use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::warn;

use crate::model::Ms;
use crate::pricing::validate_price;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;
pub const DEFAULT_STALE_RETENTION_SECS: u64 = 7 * 24 * 3600;
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_NIGHTLY_RATE: i64 = 500_000;

/// Process settings, read once at startup from `STAYBOOK_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    /// WAL appends between compactions.
    pub compact_threshold: u64,
    /// How long an expired unpaid booking is kept before the reaper drops
    /// it. Zero disables purging.
    pub stale_retention: Duration,
    pub reaper_interval: Duration,
    /// Base rate charged until an admin sets one.
    pub default_rate: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            metrics_port: None,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            stale_retention: Duration::from_secs(DEFAULT_STALE_RETENTION_SECS),
            reaper_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECS),
            default_rate: Decimal::new(DEFAULT_NIGHTLY_RATE * 100, 2),
        }
    }
}

/// Parse `key` if set. Bad values are logged and ignored.
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring unparseable {key}={raw:?}, using default");
            None
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let default_rate = parsed::<Decimal>(&lookup, "STAYBOOK_DEFAULT_RATE")
            .and_then(|rate| match validate_price(rate) {
                Ok(rate) => Some(rate),
                Err(e) => {
                    warn!("ignoring STAYBOOK_DEFAULT_RATE: {e}");
                    None
                }
            })
            .unwrap_or(defaults.default_rate);

        Self {
            data_dir: lookup("STAYBOOK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            metrics_port: parsed(&lookup, "STAYBOOK_METRICS_PORT"),
            compact_threshold: parsed(&lookup, "STAYBOOK_COMPACT_THRESHOLD")
                .unwrap_or(defaults.compact_threshold),
            stale_retention: parsed(&lookup, "STAYBOOK_STALE_RETENTION_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stale_retention),
            reaper_interval: parsed::<u64>(&lookup, "STAYBOOK_REAPER_INTERVAL_SECS")
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.reaper_interval),
            default_rate,
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("calendar.wal")
    }

    pub fn stale_retention_ms(&self) -> Ms {
        Ms::try_from(self.stale_retention.as_millis()).unwrap_or(Ms::MAX)
    }
}
