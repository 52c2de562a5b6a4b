use std::sync::Arc;

use backend::{
    config::AppConfig,
    db::Db,
    instruments::InstrumentsCache,
    metrics::counters::Counters,
    readings::SqlxReadingsRepository,
    snapshot::{SnapshotBuilder, SnapshotConfig},
    venues::{BybitClient, DeribitClient},
    worker::CycleRunner,
};
use common::logger::init_logger;

/// Connects the database and creates the readings table if needed.
async fn init_readings(cfg: &AppConfig) -> anyhow::Result<Arc<SqlxReadingsRepository>> {
    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;

    Ok(Arc::new(SqlxReadingsRepository::new(db.pool)))
}

fn build_snapshot_builder(cfg: &AppConfig, counters: &Counters) -> anyhow::Result<SnapshotBuilder> {
    let deribit = Arc::new(DeribitClient::new(
        cfg.deribit_api_url.clone(),
        cfg.request_timeout,
    )?);
    let bybit = Arc::new(BybitClient::new(
        cfg.bybit_api_url.clone(),
        cfg.request_timeout,
    )?);

    let instruments = Arc::new(InstrumentsCache::new(
        bybit.clone(),
        cfg.instruments_ttl,
        counters.clone(),
    ));

    let snapshot_cfg = SnapshotConfig {
        quote_max_age: cfg.quote_max_age,
        ..SnapshotConfig::default()
    };

    Ok(SnapshotBuilder::new(
        deribit,
        bybit,
        instruments,
        snapshot_cfg,
        counters.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let cfg = AppConfig::from_env()?;
    init_logger("vol-index", cfg.json_logs);

    tracing::info!(base_asset = %cfg.base_asset, "starting volatility index backend");

    let counters = Counters::default();
    let readings = init_readings(&cfg).await?;
    let builder = build_snapshot_builder(&cfg, &counters)?;

    let runner = Arc::new(CycleRunner::new(
        builder,
        readings,
        cfg.base_asset.clone(),
        counters,
    ));

    let worker = tokio::spawn(runner.run_forever(cfg.poll_interval));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    worker.abort();

    Ok(())
}
