//! Data-quality score for a snapshot.
//!
//! Penalties compound multiplicatively in a fixed order (health, depth,
//! staleness) and the result is rounded once at the end.

use crate::snapshot::Snapshot;
use crate::types::Venue;

pub const INDEX_VENUE_DOWN_FACTOR: f64 = 0.7;
pub const ATM_VENUE_DOWN_FACTOR: f64 = 0.8;

pub const THIN_QUOTES: usize = 50;
pub const THIN_QUOTES_FACTOR: f64 = 0.9;
pub const SPARSE_QUOTES: usize = 10;
pub const SPARSE_QUOTES_FACTOR: f64 = 0.5;

pub const STALE_MS: i64 = 60_000;
pub const STALE_FACTOR: f64 = 0.8;
pub const VERY_STALE_MS: i64 = 300_000;
pub const VERY_STALE_FACTOR: f64 = 0.5;

/// Scores `snapshot` in `[0, 100]` as of `now_ms`.
pub fn calculate_confidence(snapshot: &Snapshot, now_ms: i64) -> u8 {
    let mut confidence = 100.0_f64;

    let index_up = snapshot.is_healthy(Venue::Deribit);
    let atm_up = snapshot.is_healthy(Venue::Bybit);

    if !index_up {
        confidence *= INDEX_VENUE_DOWN_FACTOR;
    }
    if !atm_up {
        confidence *= ATM_VENUE_DOWN_FACTOR;
    }
    if !index_up && !atm_up {
        confidence = 0.0;
    }

    let quotes = snapshot.quote_count();
    if quotes < THIN_QUOTES {
        confidence *= THIN_QUOTES_FACTOR;
    }
    if quotes < SPARSE_QUOTES {
        confidence *= SPARSE_QUOTES_FACTOR;
    }
    if quotes == 0 {
        confidence = 0.0;
    }

    let staleness = snapshot.max_staleness_ms(now_ms);
    if staleness > VERY_STALE_MS {
        confidence *= VERY_STALE_FACTOR;
    } else if staleness > STALE_MS {
        confidence *= STALE_FACTOR;
    }

    confidence.round().clamp(0.0, 100.0) as u8
}
