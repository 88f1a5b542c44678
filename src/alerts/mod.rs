//! Alert delivery.
//!
//! Alerts are fire-and-forget relative to the poll cycle: each delivery
//! runs in its own spawned task with its own error boundary, so a slow
//! or unreachable channel can never stall or crash the monitor. Failed
//! deliveries are logged and not retried within the cycle; the next
//! occurrence of the same condition re-emits on its own trigger.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::types::{Alert, DeliveryError};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// A notification channel for alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert. Best-effort; the caller treats any error as
    /// logged-and-forgotten.
    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError>;

    /// Channel name for logging.
    fn name(&self) -> &str;
}

/// Spawn a best-effort delivery for one alert.
///
/// The spawned task owns the error boundary: a `DeliveryError` is
/// logged at `warn` and dropped.
pub fn dispatch(sink: Arc<dyn AlertSink>, alert: Alert) {
    tokio::spawn(async move {
        if let Err(e) = sink.deliver(&alert).await {
            warn!(
                channel = sink.name(),
                alert = %alert.title,
                error = %e,
                "Alert delivery failed"
            );
        }
    });
}

// ---------------------------------------------------------------------------
// Discord webhook
// ---------------------------------------------------------------------------

/// Posts alerts as Discord embeds to a webhook URL.
pub struct DiscordNotifier {
    http: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: String) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, webhook_url })
    }

    /// Render an alert as a webhook payload with a single embed.
    fn render(alert: &Alert) -> serde_json::Value {
        json!({
            "embeds": [{
                "title": alert.title,
                "description": format!(
                    "**{}**\n{}",
                    alert.market_label,
                    alert.detail_lines.join("\n"),
                ),
                "color": alert.color,
            }]
        })
    }
}

#[async_trait]
impl AlertSink for DiscordNotifier {
    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&Self::render(alert))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DeliveryError::Status(resp.status()));
        }
        debug!(alert = %alert.title, "Alert delivered to Discord");
        Ok(())
    }

    fn name(&self) -> &str {
        "discord"
    }
}

// ---------------------------------------------------------------------------
// Log sink
// ---------------------------------------------------------------------------

/// Fallback channel when no webhook is configured: alerts go to the
/// structured log and nowhere else.
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
        info!(
            title = %alert.title,
            market = %alert.market_label,
            details = alert.detail_lines.join(" | "),
            "ALERT"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertKind, COLOR_ORANGE};

    fn alert() -> Alert {
        Alert {
            kind: AlertKind::SharpLiquidityMove,
            title: "Sharp Liquidity Move".to_string(),
            market_label: "poly|42".to_string(),
            detail_lines: vec!["Net liquidity delta: $+6000".to_string()],
            color: COLOR_ORANGE,
        }
    }

    #[test]
    fn test_render_embed_shape() {
        let payload = DiscordNotifier::render(&alert());
        let embed = &payload["embeds"][0];
        assert_eq!(embed["title"], "Sharp Liquidity Move");
        assert_eq!(embed["color"], COLOR_ORANGE);
        let description = embed["description"].as_str().unwrap();
        assert!(description.contains("poly|42"));
        assert!(description.contains("$+6000"));
    }

    #[tokio::test]
    async fn test_log_sink_always_succeeds() {
        assert!(LogSink.deliver(&alert()).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_survives_failing_sink() {
        struct FailingSink;

        #[async_trait]
        impl AlertSink for FailingSink {
            async fn deliver(&self, _alert: &Alert) -> Result<(), DeliveryError> {
                Err(DeliveryError::Status(reqwest::StatusCode::BAD_GATEWAY))
            }
            fn name(&self) -> &str {
                "failing"
            }
        }

        // Must not panic or propagate; the spawned task swallows the error.
        dispatch(Arc::new(FailingSink), alert());
        tokio::task::yield_now().await;
    }
}
