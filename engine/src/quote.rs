use serde::Serialize;

use crate::error::QuoteRejection;
use crate::types::{OptionType, Venue};

/// A normalized two-sided option quote.
///
/// Only constructible through [`OptionQuote::from_sides`], so every value in
/// a snapshot satisfies `mid == (bid + ask) / 2` with `mid > 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionQuote {
    venue: Venue,
    instrument_id: String,
    expiry_ms: i64,
    strike: f64,
    option_type: OptionType,
    bid: f64,
    ask: f64,
    mid: f64,
    observed_at_ms: i64,
}

/// Identity of a quote before its sides are validated.
#[derive(Debug, Clone)]
pub struct QuoteKey {
    pub venue: Venue,
    pub instrument_id: String,
    pub expiry_ms: i64,
    pub strike: f64,
    pub option_type: OptionType,
    pub observed_at_ms: i64,
}

impl OptionQuote {
    /// Builds a quote when both sides are present and the mid is positive.
    pub fn from_sides(
        key: QuoteKey,
        bid: Option<f64>,
        ask: Option<f64>,
    ) -> Result<Self, QuoteRejection> {
        let (Some(bid), Some(ask)) = (bid, ask) else {
            return Err(QuoteRejection::OneSided);
        };
        if !bid.is_finite() || !ask.is_finite() {
            return Err(QuoteRejection::OneSided);
        }

        let mid = (bid + ask) / 2.0;
        if mid <= 0.0 {
            return Err(QuoteRejection::NonPositiveMid(mid));
        }

        Ok(Self {
            venue: key.venue,
            instrument_id: key.instrument_id,
            expiry_ms: key.expiry_ms,
            strike: key.strike,
            option_type: key.option_type,
            bid,
            ask,
            mid,
            observed_at_ms: key.observed_at_ms,
        })
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }
    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }
    pub fn expiry_ms(&self) -> i64 {
        self.expiry_ms
    }
    pub fn strike(&self) -> f64 {
        self.strike
    }
    pub fn option_type(&self) -> OptionType {
        self.option_type
    }
    pub fn bid(&self) -> f64 {
        self.bid
    }
    pub fn ask(&self) -> f64 {
        self.ask
    }
    pub fn mid(&self) -> f64 {
        self.mid
    }
    pub fn observed_at_ms(&self) -> i64 {
        self.observed_at_ms
    }

    /// Rejects quotes observed more than `max_age_ms` before `now_ms`.
    pub fn check_fresh(&self, now_ms: i64, max_age_ms: i64) -> Result<(), QuoteRejection> {
        let age_ms = now_ms - self.observed_at_ms;
        if age_ms > max_age_ms {
            return Err(QuoteRejection::Stale { age_ms });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> QuoteKey {
        QuoteKey {
            venue: Venue::Deribit,
            instrument_id: "BTC-29MAR24-70000-C".into(),
            expiry_ms: 1_711_699_200_000,
            strike: 70_000.0,
            option_type: OptionType::Call,
            observed_at_ms: 1_000,
        }
    }

    #[test]
    fn mid_is_average_of_sides() {
        let q = OptionQuote::from_sides(key(), Some(0.04), Some(0.06)).unwrap();
        assert!((q.mid() - 0.05).abs() < 1e-12);
        assert_eq!(q.venue(), Venue::Deribit);
    }

    #[test]
    fn one_sided_quotes_are_rejected() {
        assert_eq!(
            OptionQuote::from_sides(key(), None, Some(0.06)),
            Err(QuoteRejection::OneSided)
        );
        assert_eq!(
            OptionQuote::from_sides(key(), Some(0.06), None),
            Err(QuoteRejection::OneSided)
        );
        assert_eq!(
            OptionQuote::from_sides(key(), Some(f64::NAN), Some(0.06)),
            Err(QuoteRejection::OneSided)
        );
    }

    #[test]
    fn zero_mid_is_rejected() {
        assert!(matches!(
            OptionQuote::from_sides(key(), Some(0.0), Some(0.0)),
            Err(QuoteRejection::NonPositiveMid(_))
        ));
    }

    #[test]
    fn freshness_window() {
        let q = OptionQuote::from_sides(key(), Some(1.0), Some(2.0)).unwrap();
        assert!(q.check_fresh(61_000, 60_000).is_ok());
        assert_eq!(
            q.check_fresh(61_001, 60_000),
            Err(QuoteRejection::Stale { age_ms: 60_001 })
        );
    }
}
