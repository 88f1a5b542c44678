//! Mock feed and sink for integration testing.
//!
//! Provides deterministic `MarketFeed` and `AlertSink` implementations
//! backed by in-memory state, fully controllable from test code.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};

use riptide::alerts::AlertSink;
use riptide::platforms::MarketFeed;
use riptide::types::{Alert, DeliveryError, FeedError, MarketObservation, Platform};

/// A mock exchange feed returning scripted observations.
pub struct MockFeed {
    platform: Platform,
    observations: Arc<Mutex<Vec<MarketObservation>>>,
    /// If set, every fetch fails with a payload error.
    force_error: Arc<Mutex<bool>>,
}

impl MockFeed {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            observations: Arc::new(Mutex::new(Vec::new())),
            force_error: Arc::new(Mutex::new(false)),
        }
    }

    /// Replace the observations returned by the next fetches.
    pub fn set_observations(&self, observations: Vec<MarketObservation>) {
        *self.observations.lock().unwrap() = observations;
    }

    /// Force all subsequent fetches to fail.
    pub fn set_error(&self, fail: bool) {
        *self.force_error.lock().unwrap() = fail;
    }

    /// Convenience builder for one scripted observation.
    pub fn observation(
        platform: Platform,
        raw_id: &str,
        question: &str,
        probability: f64,
        liquidity: f64,
    ) -> MarketObservation {
        MarketObservation {
            key: platform.market_key(raw_id),
            platform,
            question: question.to_string(),
            probability,
            liquidity,
            observed_at: Utc::now(),
        }
    }
}

#[async_trait]
impl MarketFeed for MockFeed {
    async fn fetch_observations(&self) -> Result<Vec<MarketObservation>, FeedError> {
        if *self.force_error.lock().unwrap() {
            return Err(FeedError::Payload {
                platform: self.platform,
                detail: "forced failure".to_string(),
            });
        }
        Ok(self.observations.lock().unwrap().clone())
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

/// An alert sink recording everything delivered to it.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Alert>>,
    fail: Mutex<bool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn delivered(&self) -> Vec<Alert> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
        if *self.fail.lock().unwrap() {
            return Err(DeliveryError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        self.delivered.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
