//! Cross-exchange market identity matching.
//!
//! Builds a normalized question → probability lookup for a reference
//! exchange and finds matches by substring containment. This is a cheap,
//! order-dependent heuristic, not entity resolution: the first containing
//! entry wins, not the best one, and short generic questions can match
//! falsely. Callers must tolerate both false and missed matches. The
//! `QuestionMatcher` trait isolates the heuristic so a stronger matcher
//! (token-set similarity, embeddings) can replace it without touching the
//! lifecycle engine.

use crate::types::MarketObservation;

/// Insertion-ordered lookup of lower-cased question → probability.
///
/// Rebuilt in full every cycle from the reference exchange's current
/// observations. Insertion order is the match scan order, so it must be
/// deterministic; a plain HashMap would randomize which entry a generic
/// question first matches. Later duplicates of a question overwrite the
/// earlier probability in place.
#[derive(Debug, Default)]
pub struct QuestionLookup {
    entries: Vec<(String, f64)>,
}

impl QuestionLookup {
    /// Build the lookup from a reference exchange's observations.
    /// Normalizers only emit binary markets with a present probability,
    /// so no further filtering happens here.
    pub fn from_observations(observations: &[MarketObservation]) -> Self {
        let mut lookup = QuestionLookup::default();
        for obs in observations {
            lookup.insert(&obs.question, obs.probability);
        }
        lookup
    }

    fn insert(&mut self, question: &str, probability: f64) {
        let normalized = question.to_lowercase();
        match self.entries.iter_mut().find(|(q, _)| *q == normalized) {
            Some((_, p)) => *p = probability,
            None => self.entries.push((normalized, probability)),
        }
    }

    /// Entries in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(q, p)| (q.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strategy for resolving a question against a reference lookup.
pub trait QuestionMatcher: Send + Sync {
    /// Probability of the first lookup entry judged to be the same
    /// market, or `None` when nothing matches.
    fn find_match(&self, question: &str, lookup: &QuestionLookup) -> Option<f64>;
}

/// First-match substring containment, in either direction.
#[derive(Debug, Default)]
pub struct SubstringMatcher;

impl QuestionMatcher for SubstringMatcher {
    fn find_match(&self, question: &str, lookup: &QuestionLookup) -> Option<f64> {
        let normalized = question.to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        lookup
            .iter()
            .find(|(entry, _)| entry.contains(&normalized) || normalized.contains(entry))
            .map(|(_, p)| p)
    }
}
