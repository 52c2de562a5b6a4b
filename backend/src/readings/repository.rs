use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use engine::IndexResult;

use crate::readings::model::Reading;

#[async_trait]
pub trait ReadingsRepository: Send + Sync {
    /// Returns `false` when a reading with the same timestamp already exists.
    async fn insert_reading(&self, result: &IndexResult) -> Result<bool>;

    async fn latest_reading(&self) -> Result<Option<Reading>>;

    /// Readings at or after `since`, oldest first.
    async fn readings_since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>>;
}
