//! Venue REST clients and the seams the snapshot builder depends on.
//!
//! Records inside a payload are decoded one at a time: a malformed element is
//! logged and skipped, only an unusable envelope fails the call.

pub mod bybit;
pub mod deribit;
pub mod errors;

use std::future::Future;

use async_trait::async_trait;
use engine::Venue;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub use bybit::{BybitClient, TickerPage};
pub use deribit::{BookSummary, DeribitClient};
pub use errors::VenueError;

/// Index venue: option chain, spot index and the published volatility index.
#[async_trait]
pub trait DeribitApi: Send + Sync {
    async fn fetch_option_chain(&self, base_asset: &str) -> Result<Vec<BookSummary>, VenueError>;

    async fn fetch_spot_price(&self, base_asset: &str) -> Result<f64, VenueError>;

    /// Latest volatility index close, in percentage points.
    async fn fetch_volatility_index(&self, base_asset: &str) -> Result<f64, VenueError>;
}

/// ATM venue: tickers carry mark IV as a fraction. Listings come through
/// [`crate::instruments::InstrumentSource`].
#[async_trait]
pub trait BybitApi: Send + Sync {
    async fn fetch_tickers(&self, base_asset: &str) -> Result<TickerPage, VenueError>;
}

/// Decodes each element independently. Returns the decoded records and the
/// number skipped.
pub fn decode_records<T: DeserializeOwned>(
    venue: Venue,
    raw: Vec<serde_json::Value>,
) -> (Vec<T>, usize) {
    let total = raw.len();
    let mut out = Vec::with_capacity(total);

    for value in raw {
        match serde_json::from_value::<T>(value) {
            Ok(record) => out.push(record),
            Err(e) => debug!(venue = %venue, error = %e, "skipping malformed record"),
        }
    }

    let skipped = total - out.len();
    if skipped > 0 {
        warn!(venue = %venue, skipped, total, "malformed records skipped");
    }

    (out, skipped)
}

/// Awaits an optional sub-fetch. Failures are logged and replaced by `fallback`.
pub async fn best_effort<T, F>(venue: Venue, what: &'static str, fallback: T, fut: F) -> T
where
    F: Future<Output = Result<T, VenueError>>,
{
    match fut.await {
        Ok(v) => v,
        Err(e) => {
            warn!(venue = %venue, what, error = %e, "optional fetch failed, using fallback");
            fallback
        }
    }
}
