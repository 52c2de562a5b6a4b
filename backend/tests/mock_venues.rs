//! In-process venue doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backend::instruments::{InstrumentMeta, InstrumentSource};
use backend::venues::bybit::Ticker;
use backend::venues::{BookSummary, BybitApi, DeribitApi, TickerPage, VenueError};
use chrono::{TimeZone, Utc};
use engine::Venue;

pub const DAY_MS: i64 = 86_400_000;

/// 2024-03-01T08:00Z. Every fixture expiry is relative to this.
pub fn t0() -> i64 {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0)
        .unwrap()
        .timestamp_millis()
}

pub struct MockDeribit {
    pub dvol: f64,
    pub spot: f64,
    pub chain_size: usize,
    pub observed_at_ms: i64,
    pub fail_dvol: AtomicBool,
    pub fail_chain: AtomicBool,
    pub fail_spot: AtomicBool,
}

impl MockDeribit {
    pub fn healthy(dvol: f64, spot: f64, chain_size: usize, observed_at_ms: i64) -> Self {
        Self {
            dvol,
            spot,
            chain_size,
            observed_at_ms,
            fail_dvol: AtomicBool::new(false),
            fail_chain: AtomicBool::new(false),
            fail_spot: AtomicBool::new(false),
        }
    }
}

fn failure(venue: Venue) -> VenueError {
    VenueError::invalid(venue, "mock failure")
}

#[async_trait]
impl DeribitApi for MockDeribit {
    async fn fetch_option_chain(&self, _base: &str) -> Result<Vec<BookSummary>, VenueError> {
        if self.fail_chain.load(Ordering::SeqCst) {
            return Err(failure(Venue::Deribit));
        }
        Ok((0..self.chain_size)
            .map(|i| BookSummary {
                instrument_name: format!("BTC-29MAR24-{}-C", 40_000 + i * 1_000),
                bid_price: Some(0.01),
                ask_price: Some(0.02),
                mark_price: Some(0.015),
                mark_iv: Some(50.0),
                underlying_price: Some(self.spot),
                open_interest: None,
                creation_timestamp: Some(self.observed_at_ms),
            })
            .collect())
    }

    async fn fetch_spot_price(&self, _base: &str) -> Result<f64, VenueError> {
        if self.fail_spot.load(Ordering::SeqCst) {
            return Err(failure(Venue::Deribit));
        }
        Ok(self.spot)
    }

    async fn fetch_volatility_index(&self, _base: &str) -> Result<f64, VenueError> {
        if self.fail_dvol.load(Ordering::SeqCst) {
            return Err(failure(Venue::Deribit));
        }
        Ok(self.dvol)
    }
}

pub struct MockBybit {
    pub tickers: Vec<Ticker>,
    pub observed_at_ms: i64,
    pub fail: AtomicBool,
    pub panic: AtomicBool,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl MockBybit {
    pub fn new(tickers: Vec<Ticker>, observed_at_ms: i64) -> Self {
        Self {
            tickers,
            observed_at_ms,
            fail: AtomicBool::new(false),
            panic: AtomicBool::new(false),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BybitApi for MockBybit {
    async fn fetch_tickers(&self, _base: &str) -> Result<TickerPage, VenueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panic.load(Ordering::SeqCst) {
            panic!("mock bybit panicked");
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(failure(Venue::Bybit));
        }
        Ok(TickerPage {
            tickers: self.tickers.clone(),
            observed_at_ms: self.observed_at_ms,
        })
    }
}

/// Listing source that always fails, so contract terms come from symbols.
pub struct NoListing;

#[async_trait]
impl InstrumentSource for NoListing {
    async fn load_instruments(&self, _base: &str) -> Result<Vec<InstrumentMeta>, VenueError> {
        Err(failure(Venue::Bybit))
    }
}

pub fn ticker(symbol: &str, bid: &str, ask: &str, iv: &str) -> Ticker {
    Ticker {
        symbol: symbol.into(),
        bid1_price: Some(bid.into()),
        ask1_price: Some(ask.into()),
        mark_iv: Some(iv.into()),
        delta: Some("0.5".into()),
        underlying_price: None,
    }
}

/// 28-day ATM pair at 65k (call 0.50, put 0.46) plus a far strike.
pub fn atm_tickers() -> Vec<Ticker> {
    vec![
        ticker("BTC-29MAR24-65000-C", "2400", "2500", "0.50"),
        ticker("BTC-29MAR24-65000-P", "2500", "2600", "0.46"),
        ticker("BTC-29MAR24-80000-C", "300", "350", "0.60"),
    ]
}
