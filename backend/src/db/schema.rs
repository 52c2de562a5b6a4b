use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // One row per published index value. `created_at` is the reading's
    // timestamp in ms and is unique; `created_at_iso` is for humans.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS index_readings (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  value REAL NOT NULL,
  deribit_iv REAL,
  bybit_iv REAL,
  btc_price REAL,
  created_at BIGINT NOT NULL UNIQUE,
  created_at_iso TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
