use std::time::Duration;

use engine::{OptionType, Venue, parse_strike};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::instruments::{InstrumentMeta, InstrumentSource};
use crate::time::now_ms;
use crate::venues::bybit::types::{Envelope, InstrumentInfo, ListResult, Ticker};
use crate::venues::errors::VenueError;
use crate::venues::{BybitApi, decode_records};

/// Upper bound on instruments-info pages per refresh.
pub const MAX_INSTRUMENT_PAGES: usize = 20;
const INSTRUMENT_PAGE_LIMIT: &str = "1000";

/// Tickers from one request, with the time the venue served them.
#[derive(Debug, Clone, Default)]
pub struct TickerPage {
    pub tickers: Vec<Ticker>,
    pub observed_at_ms: i64,
}

#[derive(Clone)]
pub struct BybitClient {
    http: Client,
    url: String,
}

impl BybitClient {
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

    async fn get_list(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<(ListResult, Option<i64>), VenueError> {
        let url = format!("{}{}", self.url, path);

        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        let envelope: Envelope<ListResult> = resp.json().await?;

        if envelope.ret_code != 0 {
            return Err(VenueError::Api {
                venue: Venue::Bybit,
                code: envelope.ret_code,
                message: envelope.ret_msg,
            });
        }

        let result = envelope
            .result
            .ok_or_else(|| VenueError::invalid(Venue::Bybit, format!("{path}: missing result")))?;

        Ok((result, envelope.time))
    }
}

#[async_trait::async_trait]
impl InstrumentSource for BybitClient {
    #[instrument(skip(self), level = "debug")]
    async fn load_instruments(&self, base_asset: &str) -> Result<Vec<InstrumentMeta>, VenueError> {
        let mut out = Vec::new();
        let mut cursor = String::new();

        for page in 0..MAX_INSTRUMENT_PAGES {
            let mut query = vec![
                ("category", "option"),
                ("baseCoin", base_asset),
                ("limit", INSTRUMENT_PAGE_LIMIT),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }

            let (result, _) = self.get_list("/v5/market/instruments-info", &query).await?;
            let (infos, _) = decode_records::<InstrumentInfo>(Venue::Bybit, result.list);

            out.extend(
                infos
                    .iter()
                    .filter(|i| i.is_trading())
                    .filter_map(|i| instrument_meta(i, base_asset)),
            );

            match result.next_page_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = next,
                None => break,
            }

            if page + 1 == MAX_INSTRUMENT_PAGES {
                warn!(pages = MAX_INSTRUMENT_PAGES, "instrument pagination truncated");
            }
        }

        if out.is_empty() {
            return Err(VenueError::Empty {
                venue: Venue::Bybit,
                what: "instruments",
            });
        }

        debug!(instruments = out.len(), "bybit instruments loaded");
        Ok(out)
    }
}

#[async_trait::async_trait]
impl BybitApi for BybitClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_tickers(&self, base_asset: &str) -> Result<TickerPage, VenueError> {
        let (result, time) = self
            .get_list(
                "/v5/market/tickers",
                &[("category", "option"), ("baseCoin", base_asset)],
            )
            .await?;

        let (tickers, skipped) = decode_records::<Ticker>(Venue::Bybit, result.list);
        debug!(tickers = tickers.len(), skipped, "bybit tickers fetched");

        Ok(TickerPage {
            tickers,
            observed_at_ms: time.unwrap_or_else(now_ms),
        })
    }
}

/// Converts one instruments-info row. Rows with an unusable strike, expiry
/// or type are dropped.
pub fn instrument_meta(info: &InstrumentInfo, base_asset: &str) -> Option<InstrumentMeta> {
    let expiry_ms = info.delivery_time.trim().parse::<i64>().ok()?;
    let option_type = info.options_type.parse::<OptionType>().ok()?;
    let strike = match parse_strike(&info.symbol) {
        Ok(s) => s,
        Err(e) => {
            debug!(symbol = %info.symbol, error = %e, "instrument without strike");
            return None;
        }
    };

    let base = if info.base_coin.is_empty() {
        base_asset.to_ascii_uppercase()
    } else {
        info.base_coin.to_ascii_uppercase()
    };

    Some(InstrumentMeta {
        symbol: info.symbol.clone(),
        base_asset: base,
        strike,
        expiry_ms,
        option_type,
    })
}
