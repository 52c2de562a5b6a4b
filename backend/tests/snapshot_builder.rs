mod mock_venues;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use backend::error::AppError;
use backend::instruments::InstrumentsCache;
use backend::metrics::counters::Counters;
use backend::snapshot::{SnapshotBuilder, SnapshotConfig};
use backend::venues::bybit::Ticker;
use engine::{IvSignal, Venue, calculate_confidence};
use mock_venues::*;

struct Harness {
    deribit: Arc<MockDeribit>,
    bybit: Arc<MockBybit>,
    builder: SnapshotBuilder,
    counters: Counters,
}

fn harness(chain_size: usize) -> Harness {
    harness_with(atm_tickers(), chain_size)
}

fn harness_with(tickers: Vec<Ticker>, chain_size: usize) -> Harness {
    let now = t0();
    let deribit = Arc::new(MockDeribit::healthy(52.4, 64_800.0, chain_size, now));
    let bybit = Arc::new(MockBybit::new(tickers, now));
    let counters = Counters::default();

    let instruments = Arc::new(InstrumentsCache::new(
        Arc::new(NoListing),
        Duration::from_secs(1_800),
        counters.clone(),
    ));

    let builder = SnapshotBuilder::new(
        deribit.clone(),
        bybit.clone(),
        instruments,
        SnapshotConfig::default(),
        counters.clone(),
    );

    Harness {
        deribit,
        bybit,
        builder,
        counters,
    }
}

#[tokio::test]
async fn healthy_venues_produce_signals_and_quotes() {
    let h = harness(60);
    let snap = h.builder.build_snapshot("btc", t0()).await.unwrap();

    assert!(snap.is_healthy(Venue::Deribit));
    assert!(snap.is_healthy(Venue::Bybit));
    assert_eq!(snap.spot_usd(), 64_800.0);
    assert_eq!(snap.signal(Venue::Deribit), IvSignal::percent(52.4));

    let atm = snap.signal(Venue::Bybit);
    assert!((atm.value - 0.48).abs() < 1e-12);

    assert_eq!(snap.quotes_for(Venue::Deribit).len(), 60);
    assert_eq!(snap.quotes_for(Venue::Bybit).len(), 3);
    assert_eq!(calculate_confidence(&snap, t0()), 100);
}

#[tokio::test]
async fn atm_venue_failure_is_isolated() {
    let h = harness(60);
    h.bybit.fail.store(true, Ordering::SeqCst);

    let snap = h.builder.build_snapshot("BTC", t0()).await.unwrap();

    assert!(snap.is_healthy(Venue::Deribit));
    assert!(!snap.is_healthy(Venue::Bybit));
    assert_eq!(snap.signal(Venue::Bybit).value, 0.0);
    assert_eq!(snap.quotes_for(Venue::Deribit).len(), 60);
    assert_eq!(Counters::get(&h.counters.bybit_failures), 1);
}

#[tokio::test]
async fn panicked_atm_task_marks_only_that_venue_down() {
    let h = harness(60);
    h.bybit.panic.store(true, Ordering::SeqCst);

    let snap = h.builder.build_snapshot("BTC", t0()).await.unwrap();

    assert!(snap.is_healthy(Venue::Deribit));
    assert!(!snap.is_healthy(Venue::Bybit));
    assert_eq!(snap.signal(Venue::Deribit), IvSignal::percent(52.4));
    assert_eq!(snap.signal(Venue::Bybit).value, 0.0);
    assert_eq!(Counters::get(&h.counters.bybit_failures), 1);
    assert_eq!(Counters::get(&h.counters.deribit_failures), 0);
    assert_eq!(h.builder.last_success(Venue::Bybit), None);
}

#[tokio::test]
async fn percent_quoted_atm_iv_marks_the_venue_down() {
    let h = harness_with(
        vec![
            ticker("BTC-29MAR24-65000-C", "2400", "2500", "50.0"),
            ticker("BTC-29MAR24-65000-P", "2500", "2600", "46.0"),
        ],
        60,
    );

    let snap = h.builder.build_snapshot("BTC", t0()).await.unwrap();

    assert!(snap.is_healthy(Venue::Deribit));
    assert!(!snap.is_healthy(Venue::Bybit));
    assert_eq!(snap.signal(Venue::Bybit).value, 0.0);
    assert!(snap.quotes_for(Venue::Bybit).is_empty());
    assert_eq!(Counters::get(&h.counters.bybit_failures), 1);
    assert_eq!(h.builder.last_success(Venue::Bybit), None);
}

#[tokio::test]
async fn index_venue_health_follows_the_volatility_index_only() {
    let h = harness(60);
    h.deribit.fail_chain.store(true, Ordering::SeqCst);
    h.deribit.fail_spot.store(true, Ordering::SeqCst);

    let snap = h.builder.build_snapshot("BTC", t0()).await.unwrap();

    // chain and spot are optional
    assert!(snap.is_healthy(Venue::Deribit));
    assert_eq!(snap.quotes_for(Venue::Deribit).len(), 0);
    assert_eq!(snap.spot_usd(), 0.0);

    // without spot the strike comes from call delta; the lower strike wins the tie
    assert!(snap.is_healthy(Venue::Bybit));
    assert!(snap.signal(Venue::Bybit).value > 0.0);

    h.deribit.fail_dvol.store(true, Ordering::SeqCst);
    let snap = h.builder.build_snapshot("BTC", t0() + 1_000).await.unwrap();
    assert!(!snap.is_healthy(Venue::Deribit));
    assert_eq!(Counters::get(&h.counters.deribit_failures), 1);
}

#[tokio::test]
async fn last_success_survives_a_failed_cycle() {
    let h = harness(60);
    let first = t0();

    h.builder.build_snapshot("BTC", first).await.unwrap();
    assert_eq!(h.builder.last_success(Venue::Bybit), Some(first));

    h.bybit.fail.store(true, Ordering::SeqCst);
    let later = first + 120_000;
    let snap = h.builder.build_snapshot("BTC", later).await.unwrap();

    assert_eq!(snap.last_fetch().get(&Venue::Bybit), Some(&Some(first)));
    assert_eq!(snap.last_fetch().get(&Venue::Deribit), Some(&Some(later)));
    assert_eq!(snap.max_staleness_ms(later), 120_000);
}

#[tokio::test]
async fn both_venues_down_scores_zero() {
    let h = harness(60);
    h.deribit.fail_dvol.store(true, Ordering::SeqCst);
    h.bybit.fail.store(true, Ordering::SeqCst);

    let snap = h.builder.build_snapshot("BTC", t0()).await.unwrap();

    assert!(!snap.is_healthy(Venue::Deribit));
    assert!(!snap.is_healthy(Venue::Bybit));
    assert_eq!(calculate_confidence(&snap, t0()), 0);
}

#[tokio::test]
async fn invalid_base_asset_is_rejected_before_any_fetch() {
    let h = harness(0);

    let err = h.builder.build_snapshot("BTC-USD", t0()).await.unwrap_err();

    assert!(matches!(err, AppError::InvalidBaseAsset(_)));
    assert_eq!(h.bybit.calls.load(Ordering::SeqCst), 0);
}
