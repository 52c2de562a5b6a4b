//! Venue instrument identifiers.
//!
//! Both venues encode options as hyphen-delimited tokens:
//!
//! ```text
//! BTC-29MAR24-70000-C
//! BTC-5APR24-60000-P
//! BTC-24APR26-48000-C-USDT
//! ```
//!
//! base asset, date code (`D[D]MMMYY`), strike, option-type letter, and an
//! optional settlement-currency suffix. Expiry is fixed at 08:00 UTC on the
//! date encoded, which is the settlement hour both venues use.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::InstrumentParseError;
use crate::types::OptionType;

/// Settlement hour (UTC) applied to every date code.
pub const SETTLEMENT_HOUR_UTC: u32 = 8;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Canonical shape of a parsed option identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub base_asset: String,
    pub strike: f64,
    pub expiry: DateTime<Utc>,
    pub option_type: OptionType,
}

impl InstrumentSpec {
    pub fn expiry_ms(&self) -> i64 {
        self.expiry.timestamp_millis()
    }
}

/// Parses a venue identifier into strike, expiry and option type.
pub fn parse_instrument(id: &str) -> Result<InstrumentSpec, InstrumentParseError> {
    let tokens = significant_tokens(id)?;

    let base_asset = tokens[0].to_string();
    let expiry = parse_date_code(tokens[1])?;
    let strike = parse_strike_token(tokens[tokens.len() - 2])?;
    let option_type = tokens[tokens.len() - 1].parse::<OptionType>()?;

    Ok(InstrumentSpec {
        base_asset,
        strike,
        expiry,
        option_type,
    })
}

/// Extracts just the strike, for records whose expiry and type come from
/// venue metadata instead of the identifier.
pub fn parse_strike(id: &str) -> Result<f64, InstrumentParseError> {
    let tokens = significant_tokens(id)?;
    parse_strike_token(tokens[tokens.len() - 2])
}

/// Splits on `-` and drops a trailing currency suffix.
fn significant_tokens(id: &str) -> Result<Vec<&str>, InstrumentParseError> {
    let mut tokens: Vec<&str> = id.trim().split('-').collect();

    if tokens.last().is_some_and(|t| is_currency_suffix(t)) {
        tokens.pop();
    }

    if tokens.len() < 4 || tokens.iter().any(|t| t.is_empty()) {
        return Err(InstrumentParseError::TooFewTokens(id.to_string()));
    }

    Ok(tokens)
}

fn is_currency_suffix(token: &str) -> bool {
    token.len() >= 2
        && token.chars().all(|c| c.is_ascii_alphabetic())
        && token.parse::<OptionType>().is_err()
}

fn parse_strike_token(token: &str) -> Result<f64, InstrumentParseError> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(InstrumentParseError::Strike(token.to_string())),
    }
}

/// `29MAR24` / `5APR24` → that date at 08:00 UTC.
fn parse_date_code(code: &str) -> Result<DateTime<Utc>, InstrumentParseError> {
    let err = || InstrumentParseError::DateCode(code.to_string());

    if !code.is_ascii() {
        return Err(err());
    }

    let day_len = code.chars().take_while(|c| c.is_ascii_digit()).count();
    if !(1..=2).contains(&day_len) || code.len() != day_len + 5 {
        return Err(err());
    }

    let day: u32 = code[..day_len].parse().map_err(|_| err())?;
    let month_str = code[day_len..day_len + 3].to_ascii_uppercase();
    let year_str = &code[day_len + 3..];

    let month = MONTHS
        .iter()
        .position(|m| *m == month_str)
        .ok_or_else(err)? as u32
        + 1;

    if !year_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(err());
    }
    let year = 2000 + year_str.parse::<i32>().map_err(|_| err())?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(SETTLEMENT_HOUR_UTC, 0, 0))
        .ok_or_else(err)?;

    Ok(Utc.from_utc_datetime(&naive))
}
