//! Poll orchestration: feed aggregation and the per-cycle signal pass.
//!
//! `FeedRouter` fetches all exchange listings concurrently; a failed or
//! timed-out fetch degrades to an empty list for that exchange and never
//! contaminates the others. `Monitor` owns every piece of mutable state
//! (windows, per-key caches, the setup book, the discrepancy detector)
//! and runs the fetch-results through one deterministic signal pass per
//! cycle. All mutation happens on the caller's single thread of control,
//! so no locking is needed.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::engine::discrepancy::{Discrepancy, DiscrepancyDetector};
use crate::engine::lifecycle::{LifecycleConfig, SetupBook};
use crate::engine::matcher::QuestionLookup;
use crate::engine::window::LiquidityWindows;
use crate::platforms::MarketFeed;
use crate::types::{Alert, CachedMarketState, CycleReport, MarketObservation, Platform};

// ---------------------------------------------------------------------------
// Feed router
// ---------------------------------------------------------------------------

/// Aggregates observations from all enabled exchange feeds.
pub struct FeedRouter {
    feeds: Vec<Box<dyn MarketFeed>>,
}

impl FeedRouter {
    pub fn new(feeds: Vec<Box<dyn MarketFeed>>) -> Self {
        Self { feeds }
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// Fetch all exchange listings concurrently. Each feed fails soft:
    /// an error is logged and that exchange contributes nothing this
    /// cycle.
    pub async fn fetch_all(&self) -> Vec<MarketObservation> {
        let results = join_all(self.feeds.iter().map(|f| f.fetch_observations())).await;

        let mut observations = Vec::new();
        for (feed, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(batch) => {
                    debug!(platform = %feed.platform(), count = batch.len(), "Feed fetched");
                    observations.extend(batch);
                }
                Err(e) => {
                    warn!(
                        platform = %feed.platform(),
                        error = %e,
                        "Feed fetch failed, continuing without"
                    );
                }
            }
        }
        observations
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Output of one signal pass.
pub struct CycleOutcome {
    pub alerts: Vec<Alert>,
    pub discrepancies: Vec<Discrepancy>,
    pub report: CycleReport,
}

/// The single stateful driver of the liquidity-signal pipeline.
///
/// Owns the rolling windows, the previous-cycle caches, the setup book,
/// and the discrepancy detector. Constructed once at startup; all state
/// is process-memory-resident and lost on restart.
pub struct Monitor {
    windows: LiquidityWindows,
    cache: HashMap<String, CachedMarketState>,
    setups: SetupBook,
    detector: DiscrepancyDetector,
    /// Exchange whose markets are checked for mispricing.
    primary: Platform,
    /// Exchange whose listing builds the reference lookup.
    reference: Platform,
    cycle_count: u64,
}

impl Monitor {
    pub fn new(
        window_capacity: usize,
        lifecycle: LifecycleConfig,
        detector: DiscrepancyDetector,
        primary: Platform,
        reference: Platform,
    ) -> Self {
        Self {
            windows: LiquidityWindows::new(window_capacity),
            cache: HashMap::new(),
            setups: SetupBook::new(lifecycle),
            detector,
            primary,
            reference,
            cycle_count: 0,
        }
    }

    /// Run one signal pass over the cycle's observations.
    ///
    /// Per key: diff liquidity against the cached previous reading (first
    /// sightings have nothing to diff against and record no delta), feed
    /// the delta to the rolling window, run the setup lifecycle on the
    /// net window value, then overwrite the cache. Afterwards, match the
    /// primary exchange's markets against the reference exchange and rank
    /// the pricing discrepancies.
    pub fn process_cycle(
        &mut self,
        observations: &[MarketObservation],
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        self.cycle_count += 1;
        let mut alerts: Vec<Alert> = Vec::new();
        let mut skipped: u64 = 0;

        for obs in observations {
            if !obs.is_valid() {
                // Unusable reading: the key is skipped for this cycle,
                // no transition is attempted.
                debug!(market = %obs.key, "Skipping invalid observation");
                skipped += 1;
                continue;
            }

            if let Some(previous) = self.cache.get(&obs.key) {
                let delta = obs.liquidity - previous.liquidity;
                self.windows.record_delta(&obs.key, delta);
            }

            let net = self.windows.net_liquidity(&obs.key);
            alerts.extend(self.setups.evaluate(&obs.key, obs.probability, net, now));

            self.cache.insert(
                obs.key.clone(),
                CachedMarketState {
                    liquidity: obs.liquidity,
                    probability: obs.probability,
                },
            );
        }

        // Cross-exchange discrepancy pass, rebuilt from scratch each cycle.
        let primary: Vec<MarketObservation> = observations
            .iter()
            .filter(|o| o.platform == self.primary && o.is_valid())
            .cloned()
            .collect();
        let reference: Vec<MarketObservation> = observations
            .iter()
            .filter(|o| o.platform == self.reference && o.is_valid())
            .cloned()
            .collect();

        let lookup = QuestionLookup::from_observations(&reference);
        let discrepancies = self.detector.detect(&primary, &lookup);
        for d in &discrepancies {
            alerts.push(Alert::discrepancy(
                &d.market_key,
                &d.question,
                d.primary_prob,
                d.reference_prob,
            ));
        }

        let report = CycleReport {
            cycle_number: self.cycle_count,
            timestamp: now,
            observations: observations.len() as u64,
            skipped_records: skipped,
            open_setups: self.setups.open_count() as u64,
            alerts_emitted: alerts.len() as u64,
            discrepancies: discrepancies.len() as u64,
            tracked_markets: self.windows.tracked_keys() as u64,
        };

        info!(%report, "Signal pass complete");

        CycleOutcome {
            alerts,
            discrepancies,
            report,
        }
    }

    /// The open setup for a key, if any (read-only, for tests and
    /// diagnostics).
    pub fn open_setup(&self, key: &str) -> Option<&crate::types::Setup> {
        self.setups.open_setup(key)
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }
}
