use serde::Deserialize;

/// JSON-RPC style envelope used by every public endpoint.
#[derive(Debug, Deserialize)]
pub struct RpcEnvelope<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// One element of `get_book_summary_by_currency`. Sides are null when the
/// book is empty on that side.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BookSummary {
    pub instrument_name: String,
    #[serde(default)]
    pub bid_price: Option<f64>,
    #[serde(default)]
    pub ask_price: Option<f64>,
    #[serde(default)]
    pub mark_price: Option<f64>,
    /// Percentage points.
    #[serde(default)]
    pub mark_iv: Option<f64>,
    #[serde(default)]
    pub underlying_price: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct IndexPrice {
    pub index_price: f64,
}

/// Candles are `[timestamp, open, high, low, close]`.
#[derive(Debug, Deserialize)]
pub struct VolatilityIndexData {
    pub data: Vec<Vec<f64>>,
}

impl VolatilityIndexData {
    const CLOSE: usize = 4;

    /// Close of the most recent candle.
    pub fn latest_close(&self) -> Option<f64> {
        self.data
            .last()
            .and_then(|candle| candle.get(Self::CLOSE))
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
    }
}
