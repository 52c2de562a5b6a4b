use std::time::Duration;

use engine::Venue;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::time::now_ms;
use crate::venues::DeribitApi;
use crate::venues::decode_records;
use crate::venues::deribit::types::{BookSummary, IndexPrice, RpcEnvelope, VolatilityIndexData};
use crate::venues::errors::VenueError;

/// Candle width requested from the volatility index endpoint.
const DVOL_RESOLUTION_SECS: i64 = 3_600;

#[derive(Clone)]
pub struct DeribitClient {
    http: Client,
    url: String,
}

impl DeribitClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, VenueError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, VenueError> {
        let url = format!("{}/public/{}", self.url, method);

        let resp = self.http.get(&url).query(query).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        // Errors arrive as a JSON-RPC envelope with a 4xx status.
        let envelope: RpcEnvelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(VenueError::invalid(Venue::Deribit, format!("{method}: {e}")));
            }
            Err(_) => {
                return Err(VenueError::invalid(Venue::Deribit, format!("{method}: http status {status}")));
            }
        };

        if let Some(err) = envelope.error {
            return Err(VenueError::Api {
                venue: Venue::Deribit,
                code: err.code,
                message: err.message,
            });
        }

        if !status.is_success() {
            return Err(VenueError::invalid(Venue::Deribit, format!("{method}: http status {status}")));
        }

        envelope
            .result
            .ok_or_else(|| VenueError::invalid(Venue::Deribit, format!("{method}: missing result")))
    }
}

#[async_trait::async_trait]
impl DeribitApi for DeribitClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_option_chain(&self, base_asset: &str) -> Result<Vec<BookSummary>, VenueError> {
        let raw: Vec<serde_json::Value> = self
            .call(
                "get_book_summary_by_currency",
                &[("currency", base_asset.to_string()), ("kind", "option".into())],
            )
            .await?;

        let (chain, skipped) = decode_records::<BookSummary>(Venue::Deribit, raw);
        debug!(instruments = chain.len(), skipped, "deribit option chain fetched");

        Ok(chain)
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_spot_price(&self, base_asset: &str) -> Result<f64, VenueError> {
        let index_name = format!("{}_usd", base_asset.to_ascii_lowercase());
        let price: IndexPrice = self
            .call("get_index_price", &[("index_name", index_name)])
            .await?;

        if !price.index_price.is_finite() || price.index_price <= 0.0 {
            return Err(VenueError::invalid(
                Venue::Deribit,
                format!("index price {}", price.index_price),
            ));
        }

        debug!(spot = price.index_price, "deribit spot fetched");
        Ok(price.index_price)
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_volatility_index(&self, base_asset: &str) -> Result<f64, VenueError> {
        let end = now_ms();
        let start = end - DVOL_RESOLUTION_SECS * 1_000;

        let data: VolatilityIndexData = self
            .call(
                "get_volatility_index_data",
                &[
                    ("currency", base_asset.to_string()),
                    ("resolution", DVOL_RESOLUTION_SECS.to_string()),
                    ("start_timestamp", start.to_string()),
                    ("end_timestamp", end.to_string()),
                ],
            )
            .await?;

        let dvol = data.latest_close().ok_or(VenueError::Empty {
            venue: Venue::Deribit,
            what: "volatility index candles",
        })?;

        debug!(dvol, candles = data.data.len(), "deribit volatility index fetched");
        Ok(dvol)
    }
}
