use serde::Deserialize;

/// v5 envelope. `ret_code == 0` means success.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    pub result: Option<T>,
    /// Server time in ms.
    #[serde(default)]
    pub time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    #[serde(default)]
    pub list: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_page_cursor: Option<String>,
}

/// Option ticker. Numeric fields arrive as decimal strings and may be empty.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    #[serde(default)]
    pub bid1_price: Option<String>,
    #[serde(default)]
    pub ask1_price: Option<String>,
    /// Fraction, e.g. "0.5120".
    #[serde(default)]
    pub mark_iv: Option<String>,
    #[serde(default)]
    pub delta: Option<String>,
    #[serde(default)]
    pub underlying_price: Option<String>,
}

impl Ticker {
    pub fn bid(&self) -> Option<f64> {
        positive(&self.bid1_price)
    }

    pub fn ask(&self) -> Option<f64> {
        positive(&self.ask1_price)
    }

    pub fn mark_iv(&self) -> Option<f64> {
        positive(&self.mark_iv)
    }

    pub fn delta(&self) -> Option<f64> {
        decimal(&self.delta)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub base_coin: String,
    /// "Call" or "Put".
    pub options_type: String,
    /// Expiry in ms, as a decimal string.
    pub delivery_time: String,
}

impl InstrumentInfo {
    pub fn is_trading(&self) -> bool {
        self.status.is_empty() || self.status.eq_ignore_ascii_case("Trading")
    }
}

pub fn decimal(raw: &Option<String>) -> Option<f64> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Zero prices mean "no order on this side".
fn positive(raw: &Option<String>) -> Option<f64> {
    decimal(raw).filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ticker_decodes_camel_case_strings() {
        let raw = json!({
            "symbol": "BTC-29MAR24-65000-C",
            "bid1Price": "2450",
            "bid1Size": "1.2",
            "ask1Price": "2500",
            "markIv": "0.5120",
            "delta": "0.51234",
            "underlyingPrice": "64850.12"
        });

        let t: Ticker = serde_json::from_value(raw).unwrap();
        assert_eq!(t.bid(), Some(2450.0));
        assert_eq!(t.ask(), Some(2500.0));
        assert_eq!(t.mark_iv(), Some(0.512));
        assert_eq!(t.delta(), Some(0.51234));
    }

    #[test]
    fn empty_and_zero_sides_are_absent() {
        let t = Ticker {
            symbol: "BTC-29MAR24-65000-P".into(),
            bid1_price: Some("0".into()),
            ask1_price: Some("".into()),
            mark_iv: Some("abc".into()),
            delta: None,
            underlying_price: None,
        };

        assert_eq!(t.bid(), None);
        assert_eq!(t.ask(), None);
        assert_eq!(t.mark_iv(), None);
        assert_eq!(t.delta(), None);
    }

    #[test]
    fn envelope_carries_server_time() {
        let raw = json!({
            "retCode": 0,
            "retMsg": "SUCCESS",
            "result": {"category": "option", "list": [{"symbol": "x"}], "nextPageCursor": ""},
            "time": 1711000000123i64
        });
        let env: Envelope<ListResult> = serde_json::from_value(raw).unwrap();

        assert_eq!(env.time, Some(1_711_000_000_123));
        assert_eq!(env.result.unwrap().list.len(), 1);
    }
}
