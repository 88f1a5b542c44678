//! Setup lifecycle state machine.
//!
//! Per market key: NoSetup → Open(unconfirmed) → Open(confirmed) → Closed.
//! A qualifying net liquidity shift opens a setup; price movement in the
//! predicted direction confirms it; expiry or signal reversal removes it.
//! At most one open setup exists per key, which is the core invariant
//! of the whole monitor.
//!
//! Evaluation order within one cycle for a key: expiry, then reversal,
//! then confirmation, then (only with no setup open) new trigger. A setup
//! closed this cycle can therefore neither confirm nor re-trigger until
//! the next cycle.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::types::{Alert, Setup, Side};

/// Thresholds governing the state machine.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Minimum |net liquidity delta| to open a setup.
    pub alert_threshold: f64,
    /// Magnitude at which a trigger is tagged as a whale move.
    /// Tagging only; the decision logic is unchanged.
    pub whale_threshold: f64,
    /// Fractional side-price move required to confirm.
    pub confirm_pct: f64,
    /// Time budget before an open setup is invalidated.
    pub setup_expiry: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            alert_threshold: 3000.0,
            whale_threshold: 10000.0,
            confirm_pct: 0.05,
            setup_expiry: Duration::seconds(1800),
        }
    }
}

/// The book of open setups plus the transition rules.
#[derive(Debug)]
pub struct SetupBook {
    config: LifecycleConfig,
    open: HashMap<String, Setup>,
}

impl SetupBook {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            config,
            open: HashMap::new(),
        }
    }

    /// Run one cycle's transitions for a single market key.
    ///
    /// `probability` is the current YES probability and `net_delta` the
    /// net liquidity change over the rolling window. Returns the alerts
    /// emitted by whatever transition (if any) fired. The caller is
    /// responsible for skipping keys with unusable readings; this method
    /// assumes its inputs are finite and in range.
    pub fn evaluate(
        &mut self,
        key: &str,
        probability: f64,
        net_delta: f64,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        if let Some(setup) = self.open.get_mut(key) {
            // 1. Expiry, checked before anything else so a stale setup
            //    cannot confirm on the same cycle it should have died.
            if setup.age(now) > self.config.setup_expiry {
                info!(market = %key, side = %setup.side, "Setup timed out");
                let alert = Alert::invalidated(setup, "timed out");
                self.open.remove(key);
                return vec![alert];
            }

            // 2. Reversal: the shift that justified the setup unwound.
            if net_delta.abs() < self.config.alert_threshold {
                info!(
                    market = %key,
                    side = %setup.side,
                    net_delta,
                    "Liquidity signal reversed, setup removed"
                );
                let alert = Alert::invalidated(setup, "liquidity reversed");
                self.open.remove(key);
                return vec![alert];
            }

            // 3. Confirmation, sticky and evaluated at most once.
            if !setup.confirmed {
                let move_pct = setup.move_pct(probability);
                if move_pct >= self.config.confirm_pct {
                    setup.confirmed = true;
                    let side_price = setup.side_price(probability);
                    info!(
                        market = %key,
                        side = %setup.side,
                        move_pct = format!("{:+.1}%", move_pct * 100.0),
                        "Setup confirmed"
                    );
                    return vec![Alert::confirmed(setup, side_price, move_pct)];
                }
            }
            return Vec::new();
        }

        // 4. New trigger, only reached when no setup is open for the key.
        if net_delta.abs() >= self.config.alert_threshold {
            let side = if net_delta < 0.0 { Side::No } else { Side::Yes };
            let setup = Setup {
                market_key: key.to_string(),
                side,
                entry_price: side.price(probability),
                opened_at: now,
                confirmed: false,
            };
            let whale = net_delta.abs() >= self.config.whale_threshold;
            info!(
                market = %key,
                side = %side,
                entry = format!("{:.2}¢", setup.entry_price * 100.0),
                net_delta,
                whale,
                "Sharp liquidity move, setup opened"
            );
            let alert = Alert::sharp_liquidity_move(&setup, net_delta, whale);
            self.open.insert(key.to_string(), setup);
            return vec![alert];
        }

        debug!(market = %key, net_delta, "No transition");
        Vec::new()
    }

    /// The open setup for `key`, if any.
    pub fn open_setup(&self, key: &str) -> Option<&Setup> {
        self.open.get(key)
    }

    /// Number of setups currently open.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}
