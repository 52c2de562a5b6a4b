use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::instruments::{InstrumentMap, InstrumentSource};
use crate::metrics::counters::Counters;

/// TTL cache over the venue's instrument listing.
///
/// Guarantees:
/// - Readers always see a complete mapping; a refresh swaps the whole map.
/// - At most one refresh runs at a time; concurrent callers wait for it and
///   reuse its result.
/// - A failed refresh keeps serving the previous mapping (possibly stale)
///   and leaves its timestamp untouched so the next call retries.
pub struct InstrumentsCache {
    source: Arc<dyn InstrumentSource>,
    ttl_ms: i64,
    current: RwLock<Option<Entry>>,
    refresh: Mutex<()>,
    counters: Counters,
}

#[derive(Clone)]
struct Entry {
    base_asset: String,
    map: Arc<InstrumentMap>,
    loaded_at_ms: i64,
}

impl InstrumentsCache {
    pub fn new(source: Arc<dyn InstrumentSource>, ttl: Duration, counters: Counters) -> Self {
        Self {
            source,
            ttl_ms: ttl.as_millis() as i64,
            current: RwLock::new(None),
            refresh: Mutex::new(()),
            counters,
        }
    }

    /// Mapping for `base_asset` as of `now_ms`, refreshing when expired.
    ///
    /// Never fails: with no usable mapping the result is empty and callers
    /// fall back to parsing instrument ids.
    #[instrument(skip(self), target = "cache", level = "debug")]
    pub async fn get(&self, base_asset: &str, now_ms: i64) -> Arc<InstrumentMap> {
        if let Some(map) = self.fresh(base_asset, now_ms) {
            return map;
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(map) = self.fresh(base_asset, now_ms) {
            debug!("instruments refreshed by concurrent caller");
            return map;
        }

        match self.source.load_instruments(base_asset).await {
            Ok(list) => {
                let map: InstrumentMap = list.into_iter().map(|m| (m.symbol.clone(), m)).collect();
                let map = Arc::new(map);

                *self.current.write() = Some(Entry {
                    base_asset: base_asset.to_string(),
                    map: Arc::clone(&map),
                    loaded_at_ms: now_ms,
                });

                info!(instruments = map.len(), base_asset, "instruments cache refreshed");
                map
            }
            Err(e) => {
                Counters::incr(&self.counters.instrument_refresh_failures);

                let previous = self.previous(base_asset);
                warn!(
                    error = %e,
                    base_asset,
                    serving = previous.len(),
                    stale_age_ms = ?self.age_ms(now_ms),
                    "instruments refresh failed, serving previous mapping"
                );
                previous
            }
        }
    }

    /// Forces the next [`get`](Self::get) to reload. The current mapping is
    /// kept as the fallback if that reload fails.
    pub fn invalidate(&self) {
        if let Some(entry) = self.current.write().as_mut() {
            entry.loaded_at_ms = i64::MIN;
        }
    }

    /// Age of the cached mapping, if any.
    pub fn age_ms(&self, now_ms: i64) -> Option<i64> {
        self.current
            .read()
            .as_ref()
            .map(|e| now_ms.saturating_sub(e.loaded_at_ms))
    }

    fn fresh(&self, base_asset: &str, now_ms: i64) -> Option<Arc<InstrumentMap>> {
        let current = self.current.read();
        let entry = current.as_ref()?;

        if entry.base_asset != base_asset || !is_fresh(entry.loaded_at_ms, now_ms, self.ttl_ms) {
            return None;
        }
        Some(Arc::clone(&entry.map))
    }

    fn previous(&self, base_asset: &str) -> Arc<InstrumentMap> {
        self.current
            .read()
            .as_ref()
            .filter(|e| e.base_asset == base_asset)
            .map(|e| Arc::clone(&e.map))
            .unwrap_or_default()
    }
}

/// A mapping loaded at `loaded_at_ms` is served until `ttl_ms` has elapsed.
fn is_fresh(loaded_at_ms: i64, now_ms: i64, ttl_ms: i64) -> bool {
    now_ms.saturating_sub(loaded_at_ms) < ttl_ms
}
