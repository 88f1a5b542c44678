//! Kalshi integration.
//!
//! Trade API v2: https://api.elections.kalshi.com/trade-api/v2
//!
//! Market data reads work unauthenticated; an optional bearer token can
//! be supplied for higher rate limits. Prices are quoted in cents
//! (0–100): `last_price` when the market has traded, otherwise the
//! bid/ask midpoint. The listing is object-wrapped under `"markets"`.

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::platforms::{field_as_f64, field_as_str, unwrap_records, MarketFeed};
use crate::types::{FeedError, MarketObservation, Platform};

const BASE_URL: &str = "https://api.elections.kalshi.com/trade-api/v2";
const DEFAULT_LIMIT: u32 = 200;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Kalshi market-data client.
pub struct KalshiFeed {
    http: Client,
    api_key: Option<String>,
}

impl KalshiFeed {
    pub fn new(api_key: Option<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, api_key })
    }

    /// Convert one raw market record into an observation.
    ///
    /// Returns `None` when the ticker or title is missing, or when no
    /// price field yields a usable probability.
    pub fn convert_record(record: &Value) -> Option<MarketObservation> {
        let ticker = field_as_str(record, "ticker")?;
        let question = field_as_str(record, "title")?;

        let price_cents = field_as_f64(record, "last_price").filter(|p| *p > 0.0).or_else(|| {
            let bid = field_as_f64(record, "yes_bid")?;
            let ask = field_as_f64(record, "yes_ask")?;
            Some((bid + ask) / 2.0)
        })?;
        let probability = price_cents / 100.0;

        let liquidity = field_as_f64(record, "liquidity")
            .map(|cents| cents / 100.0)
            .or_else(|| field_as_f64(record, "open_interest"))
            .unwrap_or(0.0);

        Some(MarketObservation {
            key: Platform::Kalshi.market_key(ticker),
            platform: Platform::Kalshi,
            question: question.to_string(),
            probability,
            liquidity,
            observed_at: chrono::Utc::now(),
        })
    }

    /// Normalize a full listing payload, skipping malformed records.
    pub fn normalize(payload: Value) -> Result<Vec<MarketObservation>, FeedError> {
        let records = unwrap_records(payload, &["markets", "data"], Platform::Kalshi)?;
        let total = records.len();

        let observations: Vec<MarketObservation> = records
            .iter()
            .filter_map(Self::convert_record)
            .collect();

        let skipped = total - observations.len();
        if skipped > 0 {
            warn!(skipped, total, "Kalshi records dropped during normalization");
        }
        Ok(observations)
    }
}

#[async_trait::async_trait]
impl MarketFeed for KalshiFeed {
    async fn fetch_observations(&self) -> Result<Vec<MarketObservation>, FeedError> {
        let url = format!("{BASE_URL}/markets");
        debug!("Fetching Kalshi markets");

        let mut request = self.http.get(&url).query(&[
            ("status", "open".to_string()),
            ("limit", DEFAULT_LIMIT.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|source| FeedError::Request {
            platform: Platform::Kalshi,
            source,
        })?;

        if !resp.status().is_success() {
            return Err(FeedError::Status {
                platform: Platform::Kalshi,
                status: resp.status(),
            });
        }

        let payload: Value = resp.json().await.map_err(|source| FeedError::Request {
            platform: Platform::Kalshi,
            source,
        })?;

        let observations = Self::normalize(payload)?;
        info!(count = observations.len(), "Kalshi observations normalized");
        Ok(observations)
    }

    fn platform(&self) -> Platform {
        Platform::Kalshi
    }
}
