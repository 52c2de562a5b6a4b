//! Fixed-weight blend of the venue signals into the published index.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::IndexError;
use crate::types::{IvSignal, IvUnit, Venue};

pub const INDEX_VENUE_WEIGHT: f64 = 0.6;
pub const ATM_VENUE_WEIGHT: f64 = 0.4;

/// Largest plausible fractional IV (500%). Anything above was published in
/// percentage points and mislabelled.
pub const MAX_FRACTIONAL_IV: f64 = 5.0;

/// Everything the blend depends on. Nothing is read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexInputs {
    pub deribit: IvSignal,
    pub bybit: IvSignal,
    pub spot_usd: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexComponents {
    /// Percentage points, 2dp.
    pub deribit_iv: f64,
    /// Percentage points, 2dp.
    pub bybit_iv: f64,
    pub weighted_avg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexMetadata {
    pub spot_usd: f64,
}

/// Published index reading. Fields are private; a result is never mutated
/// after [`build_index`] returns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexResult {
    timestamp: DateTime<Utc>,
    value: f64,
    components: IndexComponents,
    metadata: IndexMetadata,
}

impl IndexResult {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
    pub fn value(&self) -> f64 {
        self.value
    }
    pub fn components(&self) -> &IndexComponents {
        &self.components
    }
    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }
}

/// Blends the two venue signals 60/40 after converting both to percentage points.
pub fn build_index(inputs: &IndexInputs) -> Result<IndexResult, IndexError> {
    let deribit = to_percent(Venue::Deribit, inputs.deribit)?;
    let bybit = to_percent(Venue::Bybit, inputs.bybit)?;

    let weighted = deribit * INDEX_VENUE_WEIGHT + bybit * ATM_VENUE_WEIGHT;
    let value = round2(weighted);

    let spot_usd = if inputs.spot_usd.is_finite() && inputs.spot_usd > 0.0 {
        round2(inputs.spot_usd)
    } else {
        0.0
    };

    Ok(IndexResult {
        timestamp: inputs.timestamp,
        value,
        components: IndexComponents {
            deribit_iv: round2(deribit),
            bybit_iv: round2(bybit),
            weighted_avg: value,
        },
        metadata: IndexMetadata { spot_usd },
    })
}

/// Converts a signal to percentage points, asserting its declared unit.
pub fn to_percent(venue: Venue, signal: IvSignal) -> Result<f64, IndexError> {
    let venue_name = venue.as_str();

    if !signal.value.is_finite() || signal.value < 0.0 {
        return Err(IndexError::InvalidSignal {
            venue: venue_name,
            value: signal.value,
        });
    }

    match signal.unit {
        IvUnit::Percent => Ok(signal.value),
        IvUnit::Fraction => {
            if signal.value > MAX_FRACTIONAL_IV {
                return Err(IndexError::UnitMismatch {
                    venue: venue_name,
                    value: signal.value,
                });
            }
            Ok(signal.value * 100.0)
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
