//! Application configuration loaded from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PROJECTION_FILE: &str = "event-store.json";
const DEFAULT_SNAPSHOT_INTERVAL_MS: u64 = 1000;
const DEFAULT_METRICS_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9000);

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `READ_PROJECTION_FILE`: projection snapshot path (default: `"event-store.json"`)
/// - `SNAPSHOT_INTERVAL_MS`: snapshot period (default: `1000`)
/// - `DATABASE_URL`: PostgreSQL store; the in-memory store is used when unset
/// - `METRICS_ADDR`: Prometheus listen address (default: `"0.0.0.0:9000"`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub projection_file: PathBuf,
    pub snapshot_interval: Duration,
    pub database_url: Option<String>,
    pub metrics_addr: SocketAddr,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            projection_file: lookup("READ_PROJECTION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.projection_file),
            snapshot_interval: lookup("SNAPSHOT_INTERVAL_MS")
                .and_then(|ms| ms.parse().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.snapshot_interval),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            metrics_addr: lookup("METRICS_ADDR")
                .and_then(|addr| addr.parse().ok())
                .unwrap_or(defaults.metrics_addr),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projection_file: PathBuf::from(DEFAULT_PROJECTION_FILE),
            snapshot_interval: Duration::from_millis(DEFAULT_SNAPSHOT_INTERVAL_MS),
            database_url: None,
            metrics_addr: SocketAddr::from(DEFAULT_METRICS_ADDR),
            log_level: "info".to_string(),
        }
    }
}
