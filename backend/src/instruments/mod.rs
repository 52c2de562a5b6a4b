pub mod cache;

use std::collections::HashMap;

use async_trait::async_trait;
use engine::OptionType;
use serde::Serialize;

use crate::venues::VenueError;

pub use cache::InstrumentsCache;

/// Contract metadata for one listed option, keyed by venue symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentMeta {
    pub symbol: String,
    pub base_asset: String,
    pub strike: f64,
    pub expiry_ms: i64,
    pub option_type: OptionType,
}

pub type InstrumentMap = HashMap<String, InstrumentMeta>;

/// Loads the full listing for a base asset.
#[async_trait]
pub trait InstrumentSource: Send + Sync {
    async fn load_instruments(&self, base_asset: &str) -> Result<Vec<InstrumentMeta>, VenueError>;
}
