//! Manifold Markets integration.
//!
//! Play-money exchange, useful as a fast-moving sentiment feed.
//!
//! API docs: https://docs.manifold.markets/api
//! Base URL: https://api.manifold.markets/v0/
//! Rate limit: 500 requests/minute per IP
//! Auth: not required for reads.
//!
//! Only `outcomeType == "BINARY"` markets carry a scalar probability;
//! everything else is dropped during normalization.

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::platforms::{field_as_f64, field_as_str, unwrap_records, MarketFeed};
use crate::types::{FeedError, MarketObservation, Platform};

const BASE_URL: &str = "https://api.manifold.markets/v0";
const DEFAULT_FETCH_LIMIT: u32 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Manifold market-data client.
pub struct ManifoldFeed {
    http: Client,
    /// Optional search term to narrow the listing to a topic.
    search_term: Option<String>,
}

impl ManifoldFeed {
    pub fn new(search_term: Option<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("riptide/0.1.0 (liquidity-signal-monitor)")
            .build()?;
        Ok(Self { http, search_term })
    }

    /// Listing URL: full market dump, or a binary-only search when a
    /// term is configured.
    fn listing_url(&self) -> String {
        match &self.search_term {
            Some(term) => format!(
                "{BASE_URL}/search-markets?term={}&filter=open&contractType=BINARY&limit={DEFAULT_FETCH_LIMIT}",
                urlencoding::encode(term),
            ),
            None => format!("{BASE_URL}/markets?limit={DEFAULT_FETCH_LIMIT}"),
        }
    }

    /// Convert one raw LiteMarket record into an observation.
    pub fn convert_record(record: &Value) -> Option<MarketObservation> {
        let id = field_as_str(record, "id")?;
        let question = field_as_str(record, "question")?;

        if field_as_str(record, "outcomeType") != Some("BINARY") {
            return None;
        }
        if record.get("isResolved").and_then(Value::as_bool) == Some(true) {
            return None;
        }

        let probability = field_as_f64(record, "probability")?;
        let liquidity = field_as_f64(record, "totalLiquidity")
            .or_else(|| field_as_f64(record, "volume24Hours"))
            .unwrap_or(0.0);

        Some(MarketObservation {
            key: Platform::Manifold.market_key(id),
            platform: Platform::Manifold,
            question: question.to_string(),
            probability,
            liquidity,
            observed_at: chrono::Utc::now(),
        })
    }

    /// Normalize a full listing payload, skipping malformed and
    /// non-binary records.
    pub fn normalize(payload: Value) -> Result<Vec<MarketObservation>, FeedError> {
        let records = unwrap_records(payload, &["data", "markets"], Platform::Manifold)?;
        let total = records.len();

        let observations: Vec<MarketObservation> = records
            .iter()
            .filter_map(Self::convert_record)
            .collect();

        let skipped = total - observations.len();
        if skipped > 0 {
            warn!(skipped, total, "Manifold records dropped during normalization");
        }
        Ok(observations)
    }
}

#[async_trait::async_trait]
impl MarketFeed for ManifoldFeed {
    async fn fetch_observations(&self) -> Result<Vec<MarketObservation>, FeedError> {
        let url = self.listing_url();
        debug!(url = %url, "Fetching Manifold markets");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| FeedError::Request {
                platform: Platform::Manifold,
                source,
            })?;

        if !resp.status().is_success() {
            return Err(FeedError::Status {
                platform: Platform::Manifold,
                status: resp.status(),
            });
        }

        let payload: Value = resp.json().await.map_err(|source| FeedError::Request {
            platform: Platform::Manifold,
            source,
        })?;

        let observations = Self::normalize(payload)?;
        info!(count = observations.len(), "Manifold observations normalized");
        Ok(observations)
    }

    fn platform(&self) -> Platform {
        Platform::Manifold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lite_market() -> Value {
        json!({
            "id": "abc123",
            "question": "Will X happen in 2025?",
            "outcomeType": "BINARY",
            "probability": 0.42,
            "totalLiquidity": 850.0,
            "isResolved": false,
        })
    }

    #[test]
    fn test_convert_record_valid() {
        let obs = ManifoldFeed::convert_record(&lite_market()).unwrap();
        assert_eq!(obs.key, "manifold|abc123");
        assert!((obs.probability - 0.42).abs() < 1e-10);
        assert!((obs.liquidity - 850.0).abs() < 1e-10);
    }

    #[test]
    fn test_convert_record_rejects_non_binary() {
        let mut record = lite_market();
        record["outcomeType"] = json!("MULTIPLE_CHOICE");
        assert!(ManifoldFeed::convert_record(&record).is_none());
    }

    #[test]
    fn test_convert_record_rejects_resolved() {
        let mut record = lite_market();
        record["isResolved"] = json!(true);
        assert!(ManifoldFeed::convert_record(&record).is_none());
    }

    #[test]
    fn test_convert_record_missing_probability() {
        let mut record = lite_market();
        record.as_object_mut().unwrap().remove("probability");
        assert!(ManifoldFeed::convert_record(&record).is_none());
    }

    #[test]
    fn test_convert_record_volume_fallback() {
        let mut record = lite_market();
        record.as_object_mut().unwrap().remove("totalLiquidity");
        record["volume24Hours"] = json!(120.0);
        let obs = ManifoldFeed::convert_record(&record).unwrap();
        assert!((obs.liquidity - 120.0).abs() < 1e-10);
    }

    #[test]
    fn test_listing_url_encodes_search_term() {
        let feed = ManifoldFeed::new(Some("rate cut".to_string())).unwrap();
        assert!(feed.listing_url().contains("term=rate%20cut"));

        let feed = ManifoldFeed::new(None).unwrap();
        assert!(feed.listing_url().ends_with("/markets?limit=500"));
    }

    #[test]
    fn test_normalize_skips_malformed() {
        let observations = ManifoldFeed::normalize(json!([
            lite_market(),
            {"id": "x", "question": "multi?", "outcomeType": "POLL"},
            {"garbage": true},
        ]))
        .unwrap();
        assert_eq!(observations.len(), 1);
    }
}
