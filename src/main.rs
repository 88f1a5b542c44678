//! RIPTIDE: Liquidity-Led Prediction Market Signal Monitor
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the enabled exchange feeds and the alert channel, and runs
//! the fetch→normalize→signal→alert poll loop with graceful shutdown
//! at cycle boundaries.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use riptide::alerts::{dispatch, AlertSink, DiscordNotifier, LogSink};
use riptide::config::{self, AppConfig};
use riptide::engine::discrepancy::DiscrepancyDetector;
use riptide::engine::lifecycle::LifecycleConfig;
use riptide::engine::matcher::SubstringMatcher;
use riptide::engine::poller::{FeedRouter, Monitor};
use riptide::platforms::kalshi::KalshiFeed;
use riptide::platforms::manifold::ManifoldFeed;
use riptide::platforms::polymarket::PolymarketFeed;
use riptide::platforms::MarketFeed;

const BANNER: &str = r#"
 ____  ___ ____ _____ ___ ____  _____
|  _ \|_ _|  _ \_   _|_ _|  _ \| ____|
| |_) || || |_) || |  | || | | |  _|
|  _ < | ||  __/ | |  | || |_| | |___
|_| \_\___|_|    |_| |___|____/|_____|

  Liquidity-Led Prediction Market Signal Monitor
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        poll_interval_secs = cfg.agent.poll_interval_secs,
        alert_threshold = cfg.signals.alert_threshold,
        window_capacity = cfg.signals.window_capacity,
        "RIPTIDE starting up"
    );

    // -- Initialise components -------------------------------------------

    let router = build_router(&cfg)?;
    if router.feed_count() == 0 {
        anyhow::bail!("No exchange feeds enabled, nothing to monitor");
    }

    let sink = build_sink(&cfg)?;

    let mut monitor = Monitor::new(
        cfg.signals.window_capacity,
        LifecycleConfig {
            alert_threshold: cfg.signals.alert_threshold,
            whale_threshold: cfg.signals.whale_threshold,
            confirm_pct: cfg.signals.confirm_pct,
            setup_expiry: chrono::Duration::seconds(cfg.signals.setup_expiry_secs),
        },
        DiscrepancyDetector::new(
            cfg.discrepancy.threshold,
            cfg.discrepancy.top_k,
            Box::new(SubstringMatcher),
        ),
        cfg.discrepancy.primary,
        cfg.discrepancy.reference,
    );

    // -- Main loop -------------------------------------------------------

    let poll_interval = Duration::from_secs(cfg.agent.poll_interval_secs);
    let mut interval = tokio::time::interval(poll_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.agent.poll_interval_secs,
        feeds = router.feed_count(),
        "Entering poll loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let observations = router.fetch_all().await;
                let outcome = monitor.process_cycle(&observations, Utc::now());

                for alert in outcome.alerts {
                    info!(alert = %alert, "Emitting alert");
                    dispatch(Arc::clone(&sink), alert);
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(cycles = monitor.cycle_count(), "RIPTIDE shut down cleanly.");
    Ok(())
}

/// Build the feed router from the enabled platform sections.
fn build_router(cfg: &AppConfig) -> Result<FeedRouter> {
    let mut feeds: Vec<Box<dyn MarketFeed>> = Vec::new();

    if cfg.platforms.polymarket.enabled {
        feeds.push(Box::new(PolymarketFeed::new()?));
    }

    if cfg.platforms.kalshi.enabled {
        // An api_key_env named in the config must resolve: a dangling
        // reference is a config error, fatal at startup.
        let api_key = cfg
            .platforms
            .kalshi
            .api_key_env
            .as_deref()
            .map(AppConfig::resolve_env)
            .transpose()?;
        feeds.push(Box::new(KalshiFeed::new(api_key)?));
    }

    if cfg.platforms.manifold.enabled {
        feeds.push(Box::new(ManifoldFeed::new(
            cfg.platforms.manifold.search_term.clone(),
        )?));
    }

    Ok(FeedRouter::new(feeds))
}

/// Build the alert channel: Discord when a webhook is configured and
/// resolvable, otherwise the structured log.
fn build_sink(cfg: &AppConfig) -> Result<Arc<dyn AlertSink>> {
    match cfg.alerts.discord_webhook_env.as_deref() {
        Some(env_name) => match std::env::var(env_name) {
            Ok(url) if !url.is_empty() => {
                info!("Discord alert delivery enabled");
                Ok(Arc::new(DiscordNotifier::new(url)?))
            }
            _ => {
                warn!(env = env_name, "Webhook env var unset, alerts go to the log only");
                Ok(Arc::new(LogSink))
            }
        },
        None => Ok(Arc::new(LogSink)),
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("riptide=info"));

    let json_logging = std::env::var("RIPTIDE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
