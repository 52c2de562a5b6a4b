use std::collections::BTreeMap;

use serde::Serialize;

use crate::quote::OptionQuote;
use crate::types::{IvSignal, Venue};

/// One venue's contribution to a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct VenueSnapshot {
    pub quotes: Vec<OptionQuote>,
    pub signal: IvSignal,
    pub healthy: bool,
    /// Time of the venue's last successful fetch, this cycle or earlier.
    pub fetched_at_ms: Option<i64>,
}

impl VenueSnapshot {
    /// A venue that failed this cycle and has never succeeded before.
    pub fn unhealthy(venue: Venue, fetched_at_ms: Option<i64>) -> Self {
        Self {
            quotes: Vec::new(),
            signal: IvSignal::none(venue.signal_unit()),
            healthy: false,
            fetched_at_ms,
        }
    }
}

/// Aggregate of every venue for one cycle. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    taken_at_ms: i64,
    spot_usd: f64,
    venues: BTreeMap<Venue, VenueSnapshot>,
}

impl Snapshot {
    /// Venues absent from `venues` are treated as unhealthy with no data.
    pub fn new(taken_at_ms: i64, spot_usd: f64, mut venues: BTreeMap<Venue, VenueSnapshot>) -> Self {
        for venue in Venue::ALL {
            venues
                .entry(venue)
                .or_insert_with(|| VenueSnapshot::unhealthy(venue, None));
        }

        Self {
            taken_at_ms,
            spot_usd,
            venues,
        }
    }

    pub fn taken_at_ms(&self) -> i64 {
        self.taken_at_ms
    }

    /// Underlying spot price; `0.0` when unknown.
    pub fn spot_usd(&self) -> f64 {
        self.spot_usd
    }

    pub fn venue(&self, venue: Venue) -> Option<&VenueSnapshot> {
        self.venues.get(&venue)
    }

    pub fn is_healthy(&self, venue: Venue) -> bool {
        self.venues.get(&venue).is_some_and(|v| v.healthy)
    }

    pub fn signal(&self, venue: Venue) -> IvSignal {
        self.venues
            .get(&venue)
            .map(|v| v.signal)
            .unwrap_or_else(|| IvSignal::none(venue.signal_unit()))
    }

    pub fn signals(&self) -> BTreeMap<Venue, IvSignal> {
        self.venues.iter().map(|(k, v)| (*k, v.signal)).collect()
    }

    pub fn venue_health(&self) -> BTreeMap<Venue, bool> {
        self.venues.iter().map(|(k, v)| (*k, v.healthy)).collect()
    }

    pub fn last_fetch(&self) -> BTreeMap<Venue, Option<i64>> {
        self.venues.iter().map(|(k, v)| (*k, v.fetched_at_ms)).collect()
    }

    /// Retained quotes across all venues.
    pub fn quotes(&self) -> impl Iterator<Item = &OptionQuote> {
        self.venues.values().flat_map(|v| v.quotes.iter())
    }

    pub fn quotes_for(&self, venue: Venue) -> &[OptionQuote] {
        self.venues
            .get(&venue)
            .map(|v| v.quotes.as_slice())
            .unwrap_or(&[])
    }

    pub fn quote_count(&self) -> usize {
        self.venues.values().map(|v| v.quotes.len()).sum()
    }

    /// Largest per-venue data age. A venue that never fetched is infinitely stale.
    pub fn max_staleness_ms(&self, now_ms: i64) -> i64 {
        self.venues
            .values()
            .map(|v| match v.fetched_at_ms {
                Some(ts) => now_ms.saturating_sub(ts).max(0),
                None => i64::MAX,
            })
            .max()
            .unwrap_or(i64::MAX)
    }
}
