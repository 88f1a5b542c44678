//! Polymarket integration.
//!
//! Uses the Gamma API for market discovery (no auth required).
//!
//! Gamma API: https://gamma-api.polymarket.com
//!
//! The listing endpoint has historically returned both a bare list and a
//! `{"data": [...]}` wrapper, and several numeric fields have flipped
//! between number and string encodings. `outcomePrices` is a JSON array
//! serialized *as a string*: "[\"0.65\",\"0.35\"]".

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::platforms::{field_as_f64, field_as_str, unwrap_records, MarketFeed};
use crate::types::{FeedError, MarketObservation, Platform};

const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";
const DEFAULT_LIMIT: u32 = 200;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Polymarket market-data client.
pub struct PolymarketFeed {
    http: Client,
}

impl PolymarketFeed {
    pub fn new() -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http })
    }

    /// Convert one raw Gamma record into an observation.
    ///
    /// Returns `None` for records missing an id or question, and for
    /// non-binary markets (anything without exactly two outcome prices).
    pub fn convert_record(record: &Value) -> Option<MarketObservation> {
        let id = field_as_str(record, "conditionId").or_else(|| field_as_str(record, "id"))?;
        let question = field_as_str(record, "question")?;

        let prices = Self::parse_outcome_prices(
            record.get("outcomePrices").and_then(Value::as_str).unwrap_or(""),
        )?;
        if prices.len() != 2 {
            return None;
        }
        let probability = prices[0];

        let liquidity = field_as_f64(record, "liquidity")
            .or_else(|| field_as_f64(record, "liquidityNum"))
            .unwrap_or(0.0);

        Some(MarketObservation {
            key: Platform::Polymarket.market_key(id),
            platform: Platform::Polymarket,
            question: question.to_string(),
            probability,
            liquidity,
            observed_at: chrono::Utc::now(),
        })
    }

    /// Parse outcome prices from Gamma's string format.
    /// Handles: "[\"0.65\",\"0.35\"]", "0.65, 0.35", etc.
    pub fn parse_outcome_prices(s: &str) -> Option<Vec<f64>> {
        let cleaned = s.replace(['[', ']', '"', '\\'], "");
        if cleaned.trim().is_empty() {
            return None;
        }
        cleaned
            .split(',')
            .map(|p| p.trim().parse::<f64>().ok())
            .collect()
    }

    /// Normalize a full listing payload, skipping malformed records.
    pub fn normalize(payload: Value) -> Result<Vec<MarketObservation>, FeedError> {
        let records = unwrap_records(payload, &["data", "markets"], Platform::Polymarket)?;
        let total = records.len();

        let observations: Vec<MarketObservation> = records
            .iter()
            .filter_map(Self::convert_record)
            .collect();

        let skipped = total - observations.len();
        if skipped > 0 {
            // One line per cycle, not per record
            warn!(skipped, total, "Polymarket records dropped during normalization");
        }
        Ok(observations)
    }
}

#[async_trait::async_trait]
impl MarketFeed for PolymarketFeed {
    async fn fetch_observations(&self) -> Result<Vec<MarketObservation>, FeedError> {
        let url = format!("{GAMMA_API_URL}/markets");
        debug!("Fetching Polymarket markets from Gamma API");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("active", "true"),
                ("closed", "false"),
                ("limit", &DEFAULT_LIMIT.to_string()),
            ])
            .send()
            .await
            .map_err(|source| FeedError::Request {
                platform: Platform::Polymarket,
                source,
            })?;

        if !resp.status().is_success() {
            return Err(FeedError::Status {
                platform: Platform::Polymarket,
                status: resp.status(),
            });
        }

        let payload: Value = resp.json().await.map_err(|source| FeedError::Request {
            platform: Platform::Polymarket,
            source,
        })?;

        let observations = Self::normalize(payload)?;
        info!(count = observations.len(), "Polymarket observations normalized");
        Ok(observations)
    }

    fn platform(&self) -> Platform {
        Platform::Polymarket
    }
}
