use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::logger::{child_span, warn_if_slow};
use engine::index::to_percent;
use engine::{IvSignal, Snapshot, Venue, VenueSnapshot};
use parking_lot::Mutex;
use tokio::task::JoinError;
use tracing::{Instrument, info, warn};

use crate::error::AppError;
use crate::instruments::{InstrumentMap, InstrumentsCache};
use crate::metrics::counters::Counters;
use crate::snapshot::normalize::{NormalizedChain, normalize_bybit, normalize_deribit_chain};
use crate::venues::{BybitApi, DeribitApi, TickerPage, VenueError, best_effort};

const MAX_BASE_ASSET_LEN: usize = 10;

#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    /// Quotes observed longer ago than this are dropped.
    pub quote_max_age: Duration,
    /// Venue calls slower than this are reported on the `performance` target.
    pub slow_fetch: Duration,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            quote_max_age: Duration::from_secs(60),
            slow_fetch: Duration::from_secs(3),
        }
    }
}

struct DeribitLeg {
    dvol: f64,
    chain: NormalizedChain,
}

struct BybitLeg {
    instruments: Arc<InstrumentMap>,
    page: TickerPage,
}

/// Fetches every venue concurrently and assembles one [`Snapshot`].
///
/// A venue failure marks that venue unhealthy and never fails the build.
/// The time of each venue's last successful fetch survives across builds.
pub struct SnapshotBuilder {
    deribit: Arc<dyn DeribitApi>,
    bybit: Arc<dyn BybitApi>,
    instruments: Arc<InstrumentsCache>,
    last_success: Mutex<BTreeMap<Venue, i64>>,
    cfg: SnapshotConfig,
    counters: Counters,
}

impl SnapshotBuilder {
    pub fn new(
        deribit: Arc<dyn DeribitApi>,
        bybit: Arc<dyn BybitApi>,
        instruments: Arc<InstrumentsCache>,
        cfg: SnapshotConfig,
        counters: Counters,
    ) -> Self {
        Self {
            deribit,
            bybit,
            instruments,
            last_success: Mutex::new(BTreeMap::new()),
            cfg,
            counters,
        }
    }

    /// Builds the snapshot for `base_asset` as of `now_ms`.
    ///
    /// Only an invalid base asset is an error; venue problems surface as
    /// unhealthy venues inside the snapshot.
    pub async fn build_snapshot(&self, base_asset: &str, now_ms: i64) -> Result<Snapshot, AppError> {
        let base = normalize_base_asset(base_asset)?;
        let max_age_ms = self.cfg.quote_max_age.as_millis() as i64;
        let slow = self.cfg.slow_fetch;

        let deribit = tokio::spawn(
            deribit_leg(
                Arc::clone(&self.deribit),
                base.clone(),
                now_ms,
                max_age_ms,
                slow,
            )
            .instrument(child_span("deribit")),
        );

        let spot = tokio::spawn({
            let api = Arc::clone(&self.deribit);
            let base = base.clone();
            async move {
                best_effort(
                    Venue::Deribit,
                    "spot price",
                    0.0,
                    warn_if_slow("deribit.spot", slow, api.fetch_spot_price(&base)),
                )
                .await
            }
            .instrument(child_span("spot"))
        });

        let bybit = tokio::spawn(
            bybit_leg(
                Arc::clone(&self.bybit),
                Arc::clone(&self.instruments),
                base.clone(),
                now_ms,
                slow,
            )
            .instrument(child_span("bybit")),
        );

        let (deribit, spot, bybit) = tokio::join!(deribit, spot, bybit);

        let spot_usd = spot.unwrap_or_else(|e| {
            warn!(error = %e, "spot task aborted");
            0.0
        });

        let mut venues = BTreeMap::new();

        let deribit = match joined(Venue::Deribit, deribit) {
            Ok(leg) => {
                Counters::add(&self.counters.records_skipped, leg.chain.skipped as u64);
                info!(
                    venue = %Venue::Deribit,
                    quotes = leg.chain.quotes.len(),
                    skipped = leg.chain.skipped,
                    dvol = leg.dvol,
                    "venue fetched"
                );
                VenueSnapshot {
                    quotes: leg.chain.quotes,
                    signal: IvSignal::percent(leg.dvol),
                    healthy: true,
                    fetched_at_ms: Some(self.mark_success(Venue::Deribit, now_ms)),
                }
            }
            Err(e) => self.unhealthy(Venue::Deribit, &e),
        };
        venues.insert(Venue::Deribit, deribit);

        let bybit = match joined(Venue::Bybit, bybit) {
            Ok(leg) => self.atm_venue(leg, spot_usd, now_ms, max_age_ms),
            Err(e) => self.unhealthy(Venue::Bybit, &e),
        };
        venues.insert(Venue::Bybit, bybit);

        Ok(Snapshot::new(now_ms, spot_usd, venues))
    }

    /// Normalizes the ATM venue's tickers and derives its signal. A signal
    /// that is not a plausible fraction marks the venue unhealthy for the
    /// cycle instead of reaching the index.
    fn atm_venue(&self, leg: BybitLeg, spot_usd: f64, now_ms: i64, max_age_ms: i64) -> VenueSnapshot {
        let out = normalize_bybit(&leg.page, &leg.instruments, spot_usd, now_ms, max_age_ms);
        Counters::add(&self.counters.records_skipped, out.skipped as u64);

        let signal = match &out.selection {
            Some(sel) => {
                let signal = IvSignal::fraction(sel.signal);
                if let Err(source) = to_percent(Venue::Bybit, signal) {
                    let err = VenueError::Signal {
                        venue: Venue::Bybit,
                        source,
                    };
                    return self.unhealthy(Venue::Bybit, &err);
                }

                info!(
                    venue = %Venue::Bybit,
                    quotes = out.quotes.len(),
                    candidates = out.candidates,
                    skipped = out.skipped,
                    dte_days = sel.dte_days,
                    strike = sel.strike,
                    call_iv = ?sel.call_iv,
                    put_iv = ?sel.put_iv,
                    atm_iv = sel.signal,
                    "venue fetched"
                );
                signal
            }
            None => {
                warn!(
                    venue = %Venue::Bybit,
                    quotes = out.quotes.len(),
                    candidates = out.candidates,
                    "no atm 30d selection possible"
                );
                IvSignal::none(Venue::Bybit.signal_unit())
            }
        };

        VenueSnapshot {
            quotes: out.quotes,
            signal,
            healthy: true,
            fetched_at_ms: Some(self.mark_success(Venue::Bybit, now_ms)),
        }
    }

    /// Last successful fetch time recorded for `venue`.
    pub fn last_success(&self, venue: Venue) -> Option<i64> {
        self.last_success.lock().get(&venue).copied()
    }

    fn mark_success(&self, venue: Venue, at_ms: i64) -> i64 {
        self.last_success.lock().insert(venue, at_ms);
        at_ms
    }

    fn unhealthy(&self, venue: Venue, err: &VenueError) -> VenueSnapshot {
        let counter = match venue {
            Venue::Deribit => &self.counters.deribit_failures,
            Venue::Bybit => &self.counters.bybit_failures,
        };
        Counters::incr(counter);

        let fetched_at_ms = self.last_success(venue);
        warn!(venue = %venue, error = %err, last_success_ms = ?fetched_at_ms, "venue fetch failed");

        VenueSnapshot::unhealthy(venue, fetched_at_ms)
    }
}

/// Uppercases and validates a base asset symbol such as `BTC`.
pub fn normalize_base_asset(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_BASE_ASSET_LEN
        && trimmed.chars().all(|c| c.is_ascii_alphanumeric());

    if !valid {
        return Err(AppError::InvalidBaseAsset(raw.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Index venue pipeline. Healthy iff the volatility index was fetched; the
/// option chain is best-effort.
async fn deribit_leg(
    api: Arc<dyn DeribitApi>,
    base: String,
    now_ms: i64,
    max_age_ms: i64,
    slow: Duration,
) -> Result<DeribitLeg, VenueError> {
    let (dvol, chain) = tokio::join!(
        warn_if_slow("deribit.dvol", slow, api.fetch_volatility_index(&base)),
        best_effort(
            Venue::Deribit,
            "option chain",
            Vec::new(),
            warn_if_slow("deribit.chain", slow, api.fetch_option_chain(&base)),
        ),
    );

    Ok(DeribitLeg {
        dvol: dvol?,
        chain: normalize_deribit_chain(&chain, now_ms, max_age_ms),
    })
}

/// ATM venue pipeline. Healthy iff a non-empty ticker list was fetched.
async fn bybit_leg(
    api: Arc<dyn BybitApi>,
    instruments: Arc<InstrumentsCache>,
    base: String,
    now_ms: i64,
    slow: Duration,
) -> Result<BybitLeg, VenueError> {
    let (instruments, page) = tokio::join!(
        instruments.get(&base, now_ms),
        warn_if_slow("bybit.tickers", slow, api.fetch_tickers(&base)),
    );

    let page = page?;
    if page.tickers.is_empty() {
        return Err(VenueError::Empty {
            venue: Venue::Bybit,
            what: "option tickers",
        });
    }

    Ok(BybitLeg { instruments, page })
}

fn joined<T>(venue: Venue, res: Result<Result<T, VenueError>, JoinError>) -> Result<T, VenueError> {
    res.unwrap_or_else(|e| {
        Err(VenueError::Aborted {
            venue,
            reason: e.to_string(),
        })
    })
}
