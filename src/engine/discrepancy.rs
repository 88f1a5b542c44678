//! Cross-exchange pricing discrepancy detection.
//!
//! For each primary-exchange observation, resolves a reference-exchange
//! probability through the matcher and records the spread when it clears
//! the threshold. All qualifying spreads are computed; only the ranked
//! head is surfaced downstream (a reporting cap, not a detection cap).

use tracing::debug;

use crate::engine::matcher::{QuestionLookup, QuestionMatcher};
use crate::types::MarketObservation;

/// One matched market with a probability gap between exchanges.
#[derive(Debug, Clone)]
pub struct Discrepancy {
    pub market_key: String,
    pub question: String,
    pub primary_prob: f64,
    pub reference_prob: f64,
}

impl Discrepancy {
    /// Signed spread: reference minus primary.
    pub fn spread(&self) -> f64 {
        self.reference_prob - self.primary_prob
    }
}

/// Detects and ranks cross-exchange discrepancies.
pub struct DiscrepancyDetector {
    threshold: f64,
    top_k: usize,
    matcher: Box<dyn QuestionMatcher>,
}

impl DiscrepancyDetector {
    pub fn new(threshold: f64, top_k: usize, matcher: Box<dyn QuestionMatcher>) -> Self {
        Self {
            threshold,
            top_k,
            matcher,
        }
    }

    /// Match every primary observation against the reference lookup and
    /// return the qualifying spreads, stable-sorted descending by
    /// magnitude and truncated to the reporting cap.
    pub fn detect(
        &self,
        primary: &[MarketObservation],
        reference: &QuestionLookup,
    ) -> Vec<Discrepancy> {
        let mut found: Vec<Discrepancy> = Vec::new();

        for obs in primary {
            let Some(reference_prob) = self.matcher.find_match(&obs.question, reference) else {
                continue;
            };
            let discrepancy = Discrepancy {
                market_key: obs.key.clone(),
                question: obs.question.clone(),
                primary_prob: obs.probability,
                reference_prob,
            };
            if discrepancy.spread().abs() >= self.threshold {
                debug!(
                    market = %obs.key,
                    spread = format!("{:+.3}", discrepancy.spread()),
                    "Discrepancy found"
                );
                found.push(discrepancy);
            }
        }

        found.sort_by(|a, b| {
            b.spread()
                .abs()
                .partial_cmp(&a.spread().abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        found.truncate(self.top_k);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::matcher::SubstringMatcher;
    use crate::types::MarketObservation;

    fn primary_obs(key: &str, question: &str, probability: f64) -> MarketObservation {
        let mut o = MarketObservation::sample(key, probability, 1000.0);
        o.question = question.to_string();
        o
    }

    fn detector(threshold: f64, top_k: usize) -> DiscrepancyDetector {
        DiscrepancyDetector::new(threshold, top_k, Box::new(SubstringMatcher))
    }

    fn lookup(entries: &[(&str, f64)]) -> QuestionLookup {
        let obs: Vec<MarketObservation> = entries
            .iter()
            .map(|(q, p)| primary_obs("kalshi|ref", q, *p))
            .collect();
        QuestionLookup::from_observations(&obs)
    }

    #[test]
    fn test_spread_is_reference_minus_primary() {
        let found = detector(0.05, 5).detect(
            &[primary_obs("poly|1", "Will X happen in 2025?", 0.30)],
            &lookup(&[("will x happen in 2025", 0.42)]),
        );
        assert_eq!(found.len(), 1);
        assert!((found[0].spread() - 0.12).abs() < 1e-10);
    }

    #[test]
    fn test_below_threshold_excluded() {
        let found = detector(0.05, 5).detect(
            &[primary_obs("poly|1", "Will X happen?", 0.40)],
            &lookup(&[("will x happen?", 0.43)]),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_unmatched_market_ignored() {
        let found = detector(0.05, 5).detect(
            &[primary_obs("poly|1", "Will the Lakers win?", 0.40)],
            &lookup(&[("will it rain tomorrow?", 0.90)]),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_ranked_descending_by_magnitude() {
        let found = detector(0.01, 5).detect(
            &[
                primary_obs("poly|a", "question alpha", 0.50),
                primary_obs("poly|b", "question beta", 0.50),
                primary_obs("poly|c", "question gamma", 0.50),
            ],
            &lookup(&[
                ("question alpha", 0.70),  // spread +0.20
                ("question beta", 0.45),   // spread -0.05
                ("question gamma", 0.61),  // spread +0.11
            ]),
        );
        let spreads: Vec<f64> = found.iter().map(|d| d.spread()).collect();
        assert_eq!(spreads.len(), 3);
        assert!((spreads[0] - 0.20).abs() < 1e-10);
        assert!((spreads[1] - 0.11).abs() < 1e-10);
        assert!((spreads[2] + 0.05).abs() < 1e-10);
    }

    #[test]
    fn test_top_k_is_a_reporting_cap() {
        let primary: Vec<MarketObservation> = (0..8)
            .map(|i| primary_obs(&format!("poly|{i}"), &format!("unique question {i}"), 0.10))
            .collect();
        let entries: Vec<(String, f64)> = (0..8)
            .map(|i| (format!("unique question {i}"), 0.10 + 0.05 * (i + 1) as f64))
            .collect();
        let entry_refs: Vec<(&str, f64)> =
            entries.iter().map(|(q, p)| (q.as_str(), *p)).collect();

        let found = detector(0.01, 3).detect(&primary, &lookup(&entry_refs));
        assert_eq!(found.len(), 3);
        // The head is the largest spread of all eight, not of the first three
        assert!((found[0].spread() - 0.40).abs() < 1e-10);
    }

    #[test]
    fn test_negative_spread_qualifies_by_magnitude() {
        let found = detector(0.05, 5).detect(
            &[primary_obs("poly|1", "Will X happen?", 0.60)],
            &lookup(&[("will x happen?", 0.40)]),
        );
        assert_eq!(found.len(), 1);
        assert!((found[0].spread() + 0.20).abs() < 1e-10);
    }
}
