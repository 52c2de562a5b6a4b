use chrono::{TimeZone, Utc};
use sqlx::{AnyPool, Row};
use sqlx::any::AnyPoolOptions;
use uuid::Uuid;

use backend::db::schema;
use backend::readings::{ReadingsRepository, SqlxReadingsRepository};
use engine::{IndexInputs, IndexResult, IvSignal, build_index};

/// Isolated in-memory DB per test. The unique name keeps parallel tests
/// apart while `cache=shared` lets every pool connection see the same data.
async fn setup_db() -> AnyPool {
    sqlx::any::install_default_drivers();

    let db_name = Uuid::new_v4().to_string();
    let conn = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(&conn)
        .await
        .expect("connect sqlite memory db");

    schema::migrate(&pool).await.expect("migrate");
    pool
}

/// Index result with the given venue signals; `spot` of 0 means unknown.
fn reading(deribit: f64, created_at_ms: i64, spot: f64) -> IndexResult {
    build_index(&IndexInputs {
        deribit: IvSignal::percent(deribit),
        bybit: IvSignal::fraction(0.48),
        spot_usd: spot,
        timestamp: Utc.timestamp_millis_opt(created_at_ms).unwrap(),
    })
    .unwrap()
}

fn ts(h: u32) -> i64 {
    Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0)
        .unwrap()
        .timestamp_millis()
}

#[tokio::test]
async fn insert_then_latest_round_trip() {
    let repo = SqlxReadingsRepository::new(setup_db().await);

    assert!(repo.latest_reading().await.unwrap().is_none());

    // 52.4 * 0.6 + 48.0 * 0.4 = 50.64
    assert!(repo.insert_reading(&reading(52.4, ts(8), 64_812.3)).await.unwrap());
    // 55.0 * 0.6 + 48.0 * 0.4 = 52.2
    assert!(repo.insert_reading(&reading(55.0, ts(9), 0.0)).await.unwrap());

    let latest = repo.latest_reading().await.unwrap().unwrap();
    assert_eq!(latest.value, 52.2);
    assert_eq!(latest.deribit_iv, Some(55.0));
    assert_eq!(latest.bybit_iv, Some(48.0));
    assert_eq!(latest.btc_price, None);
    assert_eq!(latest.created_at.timestamp_millis(), ts(9));
}

#[tokio::test]
async fn duplicate_timestamp_is_ignored() {
    let pool = setup_db().await;
    let repo = SqlxReadingsRepository::new(pool.clone());

    assert!(repo.insert_reading(&reading(50.0, ts(8), 1.0)).await.unwrap());
    assert!(!repo.insert_reading(&reading(90.0, ts(8), 1.0)).await.unwrap());

    let all = repo
        .readings_since(Utc.timestamp_millis_opt(0).unwrap())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].deribit_iv, Some(50.0));
    assert_eq!(all[0].btc_price, Some(1.0));

    let iso: String = sqlx::query("SELECT created_at_iso FROM index_readings")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("created_at_iso");
    assert_eq!(iso, "2024-03-01T08:00:00.000Z");
}

#[tokio::test]
async fn readings_since_is_inclusive_and_ordered() {
    let repo = SqlxReadingsRepository::new(setup_db().await);

    for (h, d) in [(10, 30.0), (8, 10.0), (9, 20.0)] {
        repo.insert_reading(&reading(d, ts(h), 0.0)).await.unwrap();
    }

    let from_nine = Utc.timestamp_millis_opt(ts(9)).unwrap();
    let got: Vec<Option<f64>> = repo
        .readings_since(from_nine)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.deribit_iv)
        .collect();

    assert_eq!(got, vec![Some(20.0), Some(30.0)]);
}
