pub mod client;
pub mod types;

pub use client::{BybitClient, MAX_INSTRUMENT_PAGES, TickerPage};
pub use types::*;
