use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use engine::IndexResult;
use sqlx::{AnyPool, Row};

use crate::readings::model::{NewReading, Reading};
use crate::readings::repository::ReadingsRepository;
use crate::time::ms_to_datetime;

/// SQLx-backed implementation of ReadingsRepository.
pub struct SqlxReadingsRepository {
    pool: AnyPool,
}

impl SqlxReadingsRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingsRepository for SqlxReadingsRepository {
    async fn insert_reading(&self, result: &IndexResult) -> anyhow::Result<bool> {
        let reading = NewReading::from(result);
        let created_at_iso = result
            .timestamp()
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let res = sqlx::query(
            r#"
INSERT INTO index_readings (value, deribit_iv, bybit_iv, btc_price, created_at, created_at_iso)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(created_at) DO NOTHING;
"#,
        )
        .bind(reading.value)
        .bind(reading.deribit_iv)
        .bind(reading.bybit_iv)
        .bind(reading.btc_price)
        .bind(reading.created_at_ms)
        .bind(created_at_iso)
        .execute(&self.pool)
        .await
        .context("insert index reading")?;

        Ok(res.rows_affected() == 1)
    }

    async fn latest_reading(&self) -> anyhow::Result<Option<Reading>> {
        let row = sqlx::query(
            r#"
SELECT id, value, deribit_iv, bybit_iv, btc_price, created_at
FROM index_readings
ORDER BY created_at DESC
LIMIT 1;
"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_reading).transpose()
    }

    async fn readings_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Reading>> {
        let rows = sqlx::query(
            r#"
SELECT id, value, deribit_iv, bybit_iv, btc_price, created_at
FROM index_readings
WHERE created_at >= ?
ORDER BY created_at ASC;
"#,
        )
        .bind(since.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in &rows {
            match row_to_reading(r) {
                Ok(reading) => out.push(reading),
                Err(e) => tracing::warn!(error = %e, "skipping malformed reading row"),
            }
        }

        Ok(out)
    }
}

fn row_to_reading(r: &sqlx::any::AnyRow) -> anyhow::Result<Reading> {
    Ok(Reading {
        id: r.try_get("id").context("id")?,
        value: r.try_get("value").context("value")?,
        deribit_iv: r.try_get("deribit_iv").context("deribit_iv")?,
        bybit_iv: r.try_get("bybit_iv").context("bybit_iv")?,
        btc_price: r.try_get("btc_price").context("btc_price")?,
        created_at: ms_to_datetime(r.try_get("created_at").context("created_at")?),
    })
}
