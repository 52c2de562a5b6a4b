//! Pure core of the volatility index.
//!
//! Everything here is synchronous and clock-free: callers pass `now_ms`
//! explicitly so that identical inputs always produce identical outputs.
//!
//! - [`instrument`] maps venue identifiers onto strike / expiry / type.
//! - [`quote`] validates two-sided quotes.
//! - [`atm`] selects the 30-day at-the-money point of a chain.
//! - [`snapshot`] is the immutable per-cycle aggregate.
//! - [`confidence`] scores a snapshot.
//! - [`index`] blends venue signals into the published value.

pub mod atm;
pub mod confidence;
pub mod error;
pub mod index;
pub mod instrument;
pub mod quote;
pub mod snapshot;
pub mod types;

pub use atm::{AtmCandidate, AtmSelection, atm_signal};
pub use confidence::calculate_confidence;
pub use error::{IndexError, InstrumentParseError, QuoteRejection};
pub use index::{IndexComponents, IndexInputs, IndexMetadata, IndexResult, build_index};
pub use instrument::{InstrumentSpec, parse_instrument, parse_strike};
pub use quote::{OptionQuote, QuoteKey};
pub use snapshot::{Snapshot, VenueSnapshot};
pub use types::{IvSignal, IvUnit, OptionType, Venue, VenueRole};

/// Milliseconds in one day, used for days-to-expiry.
pub const MS_PER_DAY: f64 = 86_400_000.0;
