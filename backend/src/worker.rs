//! Periodic aggregation cycle.
//!
//! Each cycle builds a snapshot, scores it, blends the index and persists
//! the reading. Cycles never overlap: a tick that fires while the previous
//! cycle is still running is skipped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::logger::{TraceId, cycle_span};
use engine::{IndexInputs, IndexResult, Snapshot, Venue, build_index, calculate_confidence};
use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, Span, error, info, warn};

use crate::error::AppError;
use crate::metrics::counters::Counters;
use crate::readings::ReadingsRepository;
use crate::snapshot::SnapshotBuilder;
use crate::time::{ms_to_datetime, now_ms};

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Published {
        result: IndexResult,
        confidence: u8,
        /// `false` when a reading with the same timestamp already existed.
        stored: bool,
    },
    /// The previous cycle was still in flight.
    Skipped,
}

pub struct CycleRunner {
    builder: SnapshotBuilder,
    readings: Arc<dyn ReadingsRepository>,
    base_asset: String,
    in_flight: Mutex<()>,
    counters: Counters,
}

impl CycleRunner {
    pub fn new(
        builder: SnapshotBuilder,
        readings: Arc<dyn ReadingsRepository>,
        base_asset: String,
        counters: Counters,
    ) -> Self {
        Self {
            builder,
            readings,
            base_asset,
            in_flight: Mutex::new(()),
            counters,
        }
    }

    /// Runs one cycle unless another is already running.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleOutcome> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            Counters::incr(&self.counters.cycles_skipped);
            warn!(base_asset = %self.base_asset, "previous cycle still running, skipping");
            return Ok(CycleOutcome::Skipped);
        };

        Counters::incr(&self.counters.cycles_started);

        let trace_id = TraceId::new();
        let span = cycle_span(&self.base_asset, &trace_id);

        let outcome = self.cycle().instrument(span).await;

        match &outcome {
            Ok(_) => Counters::incr(&self.counters.cycles_published),
            Err(_) => Counters::incr(&self.counters.cycles_failed),
        }
        outcome
    }

    async fn cycle(&self) -> anyhow::Result<CycleOutcome> {
        let started_ms = now_ms();

        let snapshot = self
            .builder
            .build_snapshot(&self.base_asset, started_ms)
            .await
            .context("build snapshot")?;

        let confidence = score(&snapshot);

        let result = build_index(&IndexInputs {
            deribit: snapshot.signal(Venue::Deribit),
            bybit: snapshot.signal(Venue::Bybit),
            spot_usd: snapshot.spot_usd(),
            timestamp: ms_to_datetime(started_ms),
        })
        .map_err(AppError::from)
        .context("build index")?;

        let span = Span::current();
        span.record("confidence", confidence);
        span.record("value", result.value());

        let stored = self
            .readings
            .insert_reading(&result)
            .await
            .context("persist reading")?;

        if !stored {
            warn!(timestamp = %result.timestamp(), "reading already stored for this timestamp");
        }

        info!(
            value = result.value(),
            confidence,
            deribit_iv = result.components().deribit_iv,
            bybit_iv = result.components().bybit_iv,
            spot_usd = result.metadata().spot_usd,
            deribit_quotes = snapshot.quotes_for(Venue::Deribit).len(),
            bybit_quotes = snapshot.quotes_for(Venue::Bybit).len(),
            deribit_healthy = snapshot.is_healthy(Venue::Deribit),
            bybit_healthy = snapshot.is_healthy(Venue::Bybit),
            deribit_last_fetch_ms = ?last_fetch(&snapshot, Venue::Deribit),
            bybit_last_fetch_ms = ?last_fetch(&snapshot, Venue::Bybit),
            elapsed_ms = now_ms() - started_ms,
            "index published"
        );

        Ok(CycleOutcome::Published {
            result,
            confidence,
            stored,
        })
    }

    /// Runs a cycle immediately and then once per `every`.
    ///
    /// Each cycle is spawned so a slow one does not delay the ticker; the
    /// in-flight guard turns overlaps into skips.
    pub async fn run_forever(self: Arc<Self>, every: Duration) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            base_asset = %self.base_asset,
            every_ms = every.as_millis() as u64,
            "cycle runner started"
        );

        loop {
            ticker.tick().await;

            let runner = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = runner.run_cycle().await {
                    error!(error = ?e, "cycle failed");
                }
                runner.log_counters();
            });
        }
    }

    pub fn log_counters(&self) {
        let c = &self.counters;
        info!(
            target: "metrics",
            cycles_started = Counters::get(&c.cycles_started),
            cycles_published = Counters::get(&c.cycles_published),
            cycles_skipped = Counters::get(&c.cycles_skipped),
            cycles_failed = Counters::get(&c.cycles_failed),
            deribit_failures = Counters::get(&c.deribit_failures),
            bybit_failures = Counters::get(&c.bybit_failures),
            records_skipped = Counters::get(&c.records_skipped),
            instrument_refresh_failures = Counters::get(&c.instrument_refresh_failures),
            "counters"
        );
    }
}

fn last_fetch(snapshot: &Snapshot, venue: Venue) -> Option<i64> {
    snapshot.venue(venue).and_then(|v| v.fetched_at_ms)
}

/// Scores a snapshot as of the instant it was taken. Venue fetch times are
/// stamped with the same instant, so a slow build does not read as stale data.
pub fn score(snapshot: &Snapshot) -> u8 {
    calculate_confidence(snapshot, snapshot.taken_at_ms())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use engine::{IvSignal, VenueSnapshot};

    use super::*;

    fn venue_at(fetched_at_ms: i64, quotes: usize) -> VenueSnapshot {
        let quotes = (0..quotes)
            .map(|i| {
                let key = engine::QuoteKey {
                    venue: Venue::Deribit,
                    instrument_id: format!("BTC-29MAR24-{}-C", 50_000 + i * 1_000),
                    expiry_ms: fetched_at_ms + 86_400_000,
                    strike: (50_000 + i * 1_000) as f64,
                    option_type: engine::OptionType::Call,
                    observed_at_ms: fetched_at_ms,
                };
                engine::OptionQuote::from_sides(key, Some(1.0), Some(2.0)).unwrap()
            })
            .collect();

        VenueSnapshot {
            quotes,
            signal: IvSignal::percent(50.0),
            healthy: true,
            fetched_at_ms: Some(fetched_at_ms),
        }
    }

    #[test]
    fn score_uses_the_snapshot_instant_not_the_wall_clock() {
        // taken years before the wall clock; fetched in the same instant
        let taken = 1_709_280_000_000;
        let mut venues = BTreeMap::new();
        venues.insert(Venue::Deribit, venue_at(taken, 30));
        venues.insert(Venue::Bybit, venue_at(taken, 30));
        let snapshot = Snapshot::new(taken, 65_000.0, venues);

        assert_eq!(score(&snapshot), 100);
        assert!(calculate_confidence(&snapshot, now_ms()) < 100);
    }
}
