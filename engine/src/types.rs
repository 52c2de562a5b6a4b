use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InstrumentParseError;

/// Derivatives venue contributing to the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Deribit,
    Bybit,
}

/// How a venue's signal is obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VenueRole {
    /// The venue publishes a ready-made volatility index.
    PublishedIndex,
    /// The signal is derived from the ~30 day at-the-money options.
    Atm30d,
}

impl Venue {
    pub const ALL: [Venue; 2] = [Venue::Deribit, Venue::Bybit];

    pub fn role(self) -> VenueRole {
        match self {
            Venue::Deribit => VenueRole::PublishedIndex,
            Venue::Bybit => VenueRole::Atm30d,
        }
    }

    /// Native unit of the venue's IV signal.
    pub fn signal_unit(self) -> IvUnit {
        match self {
            Venue::Deribit => IvUnit::Percent,
            Venue::Bybit => IvUnit::Fraction,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Venue::Deribit => "deribit",
            Venue::Bybit => "bybit",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl FromStr for OptionType {
    type Err = InstrumentParseError;

    /// Accepts the identifier letter (`C` / `P`) or the metadata spelling
    /// (`Call` / `Put`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "C" | "CALL" => Ok(OptionType::Call),
            "P" | "PUT" => Ok(OptionType::Put),
            _ => Err(InstrumentParseError::OptionType(s.to_string())),
        }
    }
}

/// Unit an implied-volatility figure is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IvUnit {
    /// Percentage points, e.g. `52.4`.
    Percent,
    /// Decimal fraction, e.g. `0.524`.
    Fraction,
}

/// A venue's IV signal together with the unit it was published in.
///
/// A value of `0.0` means "no data" and is carried through to scoring,
/// not treated as an error.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IvSignal {
    pub value: f64,
    pub unit: IvUnit,
}

impl IvSignal {
    pub fn percent(value: f64) -> Self {
        Self {
            value,
            unit: IvUnit::Percent,
        }
    }

    pub fn fraction(value: f64) -> Self {
        Self {
            value,
            unit: IvUnit::Fraction,
        }
    }

    pub fn none(unit: IvUnit) -> Self {
        Self { value: 0.0, unit }
    }

    pub fn has_data(&self) -> bool {
        self.value > 0.0
    }
}
