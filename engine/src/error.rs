use thiserror::Error;

/// Why a venue identifier could not be mapped onto a canonical instrument.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentParseError {
    #[error("too few tokens in instrument id: {0}")]
    TooFewTokens(String),

    #[error("invalid date code: {0}")]
    DateCode(String),

    #[error("invalid strike: {0}")]
    Strike(String),

    #[error("invalid option type: {0}")]
    OptionType(String),
}

/// Typed outcome for a venue record that is skipped instead of normalized.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteRejection {
    #[error("instrument id not parseable: {0}")]
    Instrument(#[from] InstrumentParseError),

    #[error("missing bid or ask")]
    OneSided,

    #[error("non-positive mid: {0}")]
    NonPositiveMid(f64),

    #[error("non-positive mark iv")]
    NoMarkIv,

    #[error("expired {dte_days:.3} days ago")]
    Expired { dte_days: f64 },

    #[error("quote is {age_ms} ms old")]
    Stale { age_ms: i64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("invalid signal from {venue}: {value}")]
    InvalidSignal { venue: &'static str, value: f64 },

    /// A fractional signal that is implausibly large was almost certainly
    /// already expressed in percentage points.
    #[error("unit mismatch from {venue}: {value} is not a fraction")]
    UnitMismatch { venue: &'static str, value: f64 },
}
