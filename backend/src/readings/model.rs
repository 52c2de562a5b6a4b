use chrono::{DateTime, Utc};
use engine::IndexResult;
use serde::Serialize;

/// A persisted index value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub id: i64,
    pub value: f64,
    pub deribit_iv: Option<f64>,
    pub bybit_iv: Option<f64>,
    pub btc_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Columns written for a new reading, before the row id exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub value: f64,
    pub deribit_iv: f64,
    pub bybit_iv: f64,
    /// `None` when spot was unknown for the cycle.
    pub btc_price: Option<f64>,
    pub created_at_ms: i64,
}

impl From<&IndexResult> for NewReading {
    fn from(r: &IndexResult) -> Self {
        let spot = r.metadata().spot_usd;
        Self {
            value: r.value(),
            deribit_iv: r.components().deribit_iv,
            bybit_iv: r.components().bybit_iv,
            btc_price: (spot > 0.0).then_some(spot),
            created_at_ms: r.timestamp().timestamp_millis(),
        }
    }
}
