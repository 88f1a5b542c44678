//! Shared types for the RIPTIDE monitor.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that platform, engine,
//! and alert modules can depend on them without circular references.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// A supported exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Polymarket,
    Kalshi,
    Manifold,
}

impl Platform {
    /// Short identifier used to qualify market keys ("poly|<id>").
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Platform::Polymarket => "poly",
            Platform::Kalshi => "kalshi",
            Platform::Manifold => "manifold",
        }
    }

    /// Build an exchange-qualified market key from a raw market id.
    pub fn market_key(&self, raw_id: &str) -> String {
        format!("{}|{}", self.key_prefix(), raw_id)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Polymarket => write!(f, "polymarket"),
            Platform::Kalshi => write!(f, "kalshi"),
            Platform::Manifold => write!(f, "manifold"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "polymarket" | "poly" => Ok(Platform::Polymarket),
            "kalshi" => Ok(Platform::Kalshi),
            "manifold" => Ok(Platform::Manifold),
            _ => Err(anyhow::anyhow!("Unknown platform: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Market observation
// ---------------------------------------------------------------------------

/// One normalized snapshot of a binary market, produced fresh every poll
/// cycle. Never mutated; the next cycle's observation for the same key
/// supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketObservation {
    /// Exchange-qualified unique id, e.g. "poly|0xabc123".
    pub key: String,
    pub platform: Platform,
    pub question: String,
    /// Implied YES probability (0.0–1.0).
    pub probability: f64,
    /// Liquidity proxy in USD equivalent, >= 0.
    pub liquidity: f64,
    pub observed_at: DateTime<Utc>,
}

impl fmt::Display for MarketObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (p: {:.0}% | liq: ${:.0})",
            self.platform,
            self.question,
            self.probability * 100.0,
            self.liquidity,
        )
    }
}

impl MarketObservation {
    /// Whether the numeric fields are usable for signal processing.
    /// Records failing this are skipped for the cycle, never processed.
    pub fn is_valid(&self) -> bool {
        self.probability.is_finite()
            && (0.0..=1.0).contains(&self.probability)
            && self.liquidity.is_finite()
            && self.liquidity >= 0.0
    }

    /// Helper to build a test observation with sensible defaults.
    #[cfg(test)]
    pub fn sample(key: &str, probability: f64, liquidity: f64) -> Self {
        MarketObservation {
            key: key.to_string(),
            platform: Platform::Polymarket,
            question: "Will CPI exceed 3% in Q1 2026?".to_string(),
            probability,
            liquidity,
            observed_at: Utc::now(),
        }
    }
}

/// Previous cycle's reading for a key, kept solely to compute the next
/// liquidity delta. Overwritten every cycle.
#[derive(Debug, Clone, Copy)]
pub struct CachedMarketState {
    pub liquidity: f64,
    pub probability: f64,
}

// ---------------------------------------------------------------------------
// Side & Setup
// ---------------------------------------------------------------------------

/// Hypothesized trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }

    /// Price of this side given the market's YES probability.
    pub fn price(&self, probability: f64) -> f64 {
        match self {
            Side::Yes => probability,
            Side::No => 1.0 - probability,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// An open directional hypothesis on one market, awaiting price
/// confirmation. At most one exists per market key at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setup {
    pub market_key: String,
    pub side: Side,
    pub entry_price: f64,
    pub opened_at: DateTime<Utc>,
    pub confirmed: bool,
}

impl Setup {
    /// Current price of the setup's side given the latest YES probability.
    pub fn side_price(&self, probability: f64) -> f64 {
        self.side.price(probability)
    }

    /// Fractional move of the side price since entry. Positive means the
    /// market moved in the predicted direction.
    pub fn move_pct(&self, probability: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.side_price(probability) - self.entry_price) / self.entry_price
    }

    /// How long the setup has been open.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.opened_at
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {:.2}¢{}",
            self.market_key,
            self.side,
            self.entry_price * 100.0,
            if self.confirmed { " [confirmed]" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Embed colors for the notification channel.
pub const COLOR_ORANGE: u32 = 0xE67E22;
pub const COLOR_GREEN: u32 = 0x2ECC71;
pub const COLOR_RED: u32 = 0xE74C3C;
pub const COLOR_BLUE: u32 = 0x3498DB;

/// Category of a lifecycle or discrepancy alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    SharpLiquidityMove,
    Confirmed,
    Invalidated,
    Discrepancy,
}

/// Immutable description of a lifecycle transition or discrepancy finding,
/// carrying everything a notification channel needs to render it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub market_label: String,
    pub detail_lines: Vec<String>,
    pub color: u32,
}

impl Alert {
    /// A qualifying liquidity shift opened a new setup.
    pub fn sharp_liquidity_move(setup: &Setup, net_delta: f64, whale: bool) -> Self {
        let title = if whale {
            "🐋 Whale Liquidity Move".to_string()
        } else {
            "Sharp Liquidity Move".to_string()
        };
        Alert {
            kind: AlertKind::SharpLiquidityMove,
            title,
            market_label: setup.market_key.clone(),
            detail_lines: vec![
                format!("Net liquidity delta: ${net_delta:+.0}"),
                format!("Opened {} @ {:.2}¢", setup.side, setup.entry_price * 100.0),
            ],
            color: COLOR_ORANGE,
        }
    }

    /// Price moved in the predicted direction past the confirmation bar.
    pub fn confirmed(setup: &Setup, current_side_price: f64, move_pct: f64) -> Self {
        Alert {
            kind: AlertKind::Confirmed,
            title: "Setup Confirmed".to_string(),
            market_label: setup.market_key.clone(),
            detail_lines: vec![
                format!(
                    "{} entry {:.2}¢ → now {:.2}¢",
                    setup.side,
                    setup.entry_price * 100.0,
                    current_side_price * 100.0,
                ),
                format!("Move: {:+.1}%", move_pct * 100.0),
            ],
            color: COLOR_GREEN,
        }
    }

    /// Setup removed: expired or the liquidity signal reversed.
    pub fn invalidated(setup: &Setup, reason: &str) -> Self {
        Alert {
            kind: AlertKind::Invalidated,
            title: "Setup Invalidated".to_string(),
            market_label: setup.market_key.clone(),
            detail_lines: vec![
                format!("Reason: {reason}"),
                format!("Was {} @ {:.2}¢", setup.side, setup.entry_price * 100.0),
            ],
            color: COLOR_RED,
        }
    }

    /// Cross-exchange probability gap on a matched market.
    pub fn discrepancy(
        market_key: &str,
        question: &str,
        primary_prob: f64,
        reference_prob: f64,
    ) -> Self {
        let spread = reference_prob - primary_prob;
        Alert {
            kind: AlertKind::Discrepancy,
            title: "Cross-Exchange Discrepancy".to_string(),
            market_label: market_key.to_string(),
            detail_lines: vec![
                question.to_string(),
                format!(
                    "{:.0}% vs {:.0}% (spread {:+.1}pp)",
                    primary_prob * 100.0,
                    reference_prob * 100.0,
                    spread * 100.0,
                ),
            ],
            color: COLOR_BLUE,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} :: {} | {}",
            self.title,
            self.market_label,
            self.detail_lines.join(" | "),
        )
    }
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of a single fetch→normalize→signal cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub timestamp: DateTime<Utc>,
    pub observations: u64,
    pub skipped_records: u64,
    pub open_setups: u64,
    pub alerts_emitted: u64,
    pub discrepancies: u64,
    pub tracked_markets: u64,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle #{}: observed={} skipped={} setups={} alerts={} discrepancies={} tracked={}",
            self.cycle_number,
            self.observations,
            self.skipped_records,
            self.open_setups,
            self.alerts_emitted,
            self.discrepancies,
            self.tracked_markets,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while fetching or normalizing one exchange's listing.
/// Always recovered at the cycle boundary: a failed feed contributes an
/// empty list for that cycle and never contaminates other exchanges.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("{platform} request failed: {source}")]
    Request {
        platform: Platform,
        #[source]
        source: reqwest::Error,
    },

    #[error("{platform} returned HTTP {status}")]
    Status {
        platform: Platform,
        status: reqwest::StatusCode,
    },

    #[error("unexpected {platform} payload: {detail}")]
    Payload { platform: Platform, detail: String },
}

/// Errors raised while delivering an alert. Recovered and logged; the
/// poll cycle never blocks on or aborts for a failed delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("alert delivery request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("alert channel returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
