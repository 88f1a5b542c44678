//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys, webhook URLs) are referenced by env-var name in
//! the config and resolved at runtime via `std::env::var`. A missing
//! required credential is fatal at startup; nothing is reloaded later.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::types::Platform;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub signals: SignalsConfig,
    pub discrepancy: DiscrepancyConfig,
    pub platforms: PlatformsConfig,
    pub alerts: AlertsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub poll_interval_secs: u64,
}

/// Thresholds for the liquidity-signal state machine.
#[derive(Debug, Deserialize, Clone)]
pub struct SignalsConfig {
    /// Minimum |net liquidity delta| (USD) to open a setup.
    pub alert_threshold: f64,
    /// Magnitude tagged as a whale move in alerts.
    pub whale_threshold: f64,
    /// Fractional side-price move required to confirm a setup.
    pub confirm_pct: f64,
    /// Seconds before an open setup is invalidated.
    pub setup_expiry_secs: i64,
    /// Rolling window length in cycles.
    pub window_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscrepancyConfig {
    /// Minimum |probability spread| to report.
    pub threshold: f64,
    /// Ranked head surfaced per cycle.
    pub top_k: usize,
    /// Exchange whose markets are checked for mispricing.
    pub primary: Platform,
    /// Exchange whose listing builds the reference lookup.
    pub reference: Platform,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlatformsConfig {
    pub polymarket: PolymarketConfig,
    pub kalshi: KalshiConfig,
    pub manifold: ManifoldConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolymarketConfig {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KalshiConfig {
    pub enabled: bool,
    /// Env var holding an optional bearer token for higher rate limits.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ManifoldConfig {
    pub enabled: bool,
    /// Optional topic filter applied via the search endpoint.
    #[serde(default)]
    pub search_term: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertsConfig {
    /// Env var holding the Discord webhook URL. When unset (or the var
    /// is empty), alerts fall back to the structured log.
    #[serde(default)]
    pub discord_webhook_env: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [agent]
        name = "RIPTIDE-001"
        poll_interval_secs = 60

        [signals]
        alert_threshold = 3000.0
        whale_threshold = 10000.0
        confirm_pct = 0.05
        setup_expiry_secs = 1800
        window_capacity = 5

        [discrepancy]
        threshold = 0.05
        top_k = 5
        primary = "Polymarket"
        reference = "Kalshi"

        [platforms.polymarket]
        enabled = true

        [platforms.kalshi]
        enabled = true
        api_key_env = "KALSHI_API_KEY"

        [platforms.manifold]
        enabled = false

        [alerts]
        discord_webhook_env = "DISCORD_WEBHOOK_URL"
    "#;

    #[test]
    fn test_parse_sample_config() {
        let cfg: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.agent.name, "RIPTIDE-001");
        assert_eq!(cfg.agent.poll_interval_secs, 60);
        assert!((cfg.signals.alert_threshold - 3000.0).abs() < 1e-10);
        assert_eq!(cfg.signals.window_capacity, 5);
        assert_eq!(cfg.discrepancy.primary, Platform::Polymarket);
        assert_eq!(cfg.discrepancy.reference, Platform::Kalshi);
        assert!(cfg.platforms.kalshi.enabled);
        assert_eq!(
            cfg.platforms.kalshi.api_key_env.as_deref(),
            Some("KALSHI_API_KEY")
        );
        assert!(!cfg.platforms.manifold.enabled);
    }

    #[test]
    fn test_optional_fields_default() {
        let trimmed = SAMPLE
            .replace("api_key_env = \"KALSHI_API_KEY\"", "")
            .replace("discord_webhook_env = \"DISCORD_WEBHOOK_URL\"", "");
        let cfg: AppConfig = toml::from_str(&trimmed).unwrap();
        assert!(cfg.platforms.kalshi.api_key_env.is_none());
        assert!(cfg.alerts.discord_webhook_env.is_none());
        assert!(cfg.platforms.manifold.search_term.is_none());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load("/nonexistent/config.toml").is_err());
    }
}
