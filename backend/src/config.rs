use std::time::Duration;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    /// Underlying asset the index is computed for, e.g. `BTC`.
    pub base_asset: String,

    /// Emit one JSON object per log line instead of pretty output.
    pub json_logs: bool,

    // =========================
    // Venue endpoints
    // =========================
    /// Base URL of the index venue's v2 REST API.
    pub deribit_api_url: String,

    /// Base URL of the ATM venue's REST API (v5 paths are appended).
    pub bybit_api_url: String,

    /// Per-request HTTP timeout.
    ///
    /// A venue that does not answer within this bound is marked unhealthy
    /// for the cycle rather than stalling it.
    pub request_timeout: Duration,

    // =========================
    // Cycle configuration
    // =========================
    /// Time between aggregation cycles.
    ///
    /// A cycle still running when the next tick fires causes that tick to
    /// be skipped, never queued.
    pub poll_interval: Duration,

    /// How long the instrument listing is reused before a refresh.
    ///
    /// Listings change only when contracts are added or expire, so this is
    /// much longer than the poll interval.
    pub instruments_ttl: Duration,

    /// Quotes observed longer ago than this are dropped from the snapshot.
    pub quote_max_age: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Unset keys take their
    /// defaults; set but malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let string = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let seconds = |key: &'static str, default: u64| -> Result<Duration, AppError> {
            parse_u64(key, lookup(key), default).map(Duration::from_secs)
        };

        let poll_interval = seconds("POLL_INTERVAL_SECS", 300)?;
        if poll_interval.is_zero() {
            return Err(AppError::Config {
                key: "POLL_INTERVAL_SECS",
                reason: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            database_url: string("DATABASE_URL", "sqlite://vol_index.db?mode=rwc"),
            base_asset: string("BASE_ASSET", "BTC").to_ascii_uppercase(),
            json_logs: lookup("APP_ENV").is_some_and(|v| v == "production"),

            deribit_api_url: string("DERIBIT_API_URL", "https://www.deribit.com/api/v2"),
            bybit_api_url: string("BYBIT_API_URL", "https://api.bybit.com"),
            request_timeout: Duration::from_millis(parse_u64(
                "REQUEST_TIMEOUT_MS",
                lookup("REQUEST_TIMEOUT_MS"),
                10_000,
            )?),

            poll_interval,
            instruments_ttl: seconds("INSTRUMENTS_TTL_SECS", 1_800)?,
            quote_max_age: seconds("QUOTE_MAX_AGE_SECS", 60)?,
        })
    }
}

fn parse_u64(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, AppError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|e| AppError::Config {
            key,
            reason: format!("{v:?}: {e}"),
        }),
    }
}
