//! Exchange integrations.
//!
//! Defines the `MarketFeed` trait and provides normalizers for:
//! - Polymarket (Gamma API): primary exchange, no auth for market data
//! - Kalshi (trade API v2): reference exchange for discrepancy checks
//! - Manifold: play-money sentiment feed
//!
//! Each feed converts the exchange's raw listing into canonical
//! `MarketObservation`s. Payloads are parsed defensively: numeric fields
//! may arrive as strings, responses may be list-shaped or object-wrapped,
//! and a malformed record is skipped without failing the batch.

pub mod kalshi;
pub mod manifold;
pub mod polymarket;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{FeedError, MarketObservation, Platform};

/// Abstraction over exchange market listings.
///
/// Implementors fetch the current listing and normalize it. A fetch is
/// independently fault-tolerant from the caller's point of view: the
/// orchestrator degrades any error to an empty list for the cycle.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Fetch and normalize all active binary markets on this exchange.
    async fn fetch_observations(&self) -> Result<Vec<MarketObservation>, FeedError>;

    /// Which exchange this feed serves.
    fn platform(&self) -> Platform;
}

/// Read a JSON value as f64, tolerating numbers that arrive as strings.
/// Exchanges have historically flipped field types between releases.
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Read a named field from a JSON object as f64 (number or string form).
pub(crate) fn field_as_f64(object: &Value, field: &str) -> Option<f64> {
    object.get(field).and_then(value_as_f64)
}

/// Read a named field as a non-empty string.
pub(crate) fn field_as_str<'a>(object: &'a Value, field: &str) -> Option<&'a str> {
    object.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Unwrap a listing response into its record array. Tolerates both a
/// bare list and an object wrapping the list under a known field name.
pub(crate) fn unwrap_records(
    payload: Value,
    wrapper_fields: &[&str],
    platform: Platform,
) -> Result<Vec<Value>, FeedError> {
    match payload {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => {
            for field in wrapper_fields {
                if let Some(Value::Array(records)) = map.remove(*field) {
                    return Ok(records);
                }
            }
            Err(FeedError::Payload {
                platform,
                detail: format!(
                    "expected a list or an object wrapping one of {wrapper_fields:?}"
                ),
            })
        }
        other => Err(FeedError::Payload {
            platform,
            detail: format!("expected list or object, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_as_f64_number_and_string() {
        assert_eq!(value_as_f64(&json!(12.5)), Some(12.5));
        assert_eq!(value_as_f64(&json!("12.5")), Some(12.5));
        assert_eq!(value_as_f64(&json!(" 7 ")), Some(7.0));
        assert_eq!(value_as_f64(&json!("not a number")), None);
        assert_eq!(value_as_f64(&json!(null)), None);
        assert_eq!(value_as_f64(&json!([1.0])), None);
    }

    #[test]
    fn test_field_as_f64() {
        let obj = json!({"liquidity": "1500.5", "volume": 2000});
        assert_eq!(field_as_f64(&obj, "liquidity"), Some(1500.5));
        assert_eq!(field_as_f64(&obj, "volume"), Some(2000.0));
        assert_eq!(field_as_f64(&obj, "missing"), None);
    }

    #[test]
    fn test_field_as_str_rejects_empty() {
        let obj = json!({"id": "abc", "blank": ""});
        assert_eq!(field_as_str(&obj, "id"), Some("abc"));
        assert_eq!(field_as_str(&obj, "blank"), None);
    }

    #[test]
    fn test_unwrap_bare_list() {
        let records =
            unwrap_records(json!([{"a": 1}, {"a": 2}]), &["data"], Platform::Polymarket).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_unwrap_object_wrapped() {
        let records = unwrap_records(
            json!({"markets": [{"a": 1}], "cursor": "xyz"}),
            &["markets", "data"],
            Platform::Kalshi,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_unwrap_unknown_shape_is_payload_error() {
        let err = unwrap_records(json!({"nothing": 1}), &["data"], Platform::Polymarket)
            .unwrap_err();
        assert!(matches!(err, FeedError::Payload { .. }));

        let err = unwrap_records(json!("scalar"), &["data"], Platform::Polymarket).unwrap_err();
        assert!(matches!(err, FeedError::Payload { .. }));
    }
}
