//! Rolling liquidity-delta windows.
//!
//! One bounded FIFO window of per-cycle liquidity deltas per market key.
//! The net (signed sum) over the window is the signal fed to the setup
//! lifecycle engine: it smooths single-snapshot noise while staying O(1)
//! amortized per update. The sum is recomputed on read rather than kept
//! incrementally; N is small, a few extra additions per cycle.

use std::collections::{HashMap, VecDeque};

/// Per-market rolling windows of liquidity deltas.
///
/// Windows are created on the first delta for a key and persist for the
/// process lifetime. Keys for markets that vanish from an exchange's
/// listing are never evicted; see DESIGN.md for the retention question.
#[derive(Debug)]
pub struct LiquidityWindows {
    windows: HashMap<String, VecDeque<f64>>,
    capacity: usize,
}

impl LiquidityWindows {
    /// Create a tracker with the given per-key window capacity.
    /// A zero capacity is clamped to 1 so a delta is never silently lost.
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a delta to the window for `key`, creating the window if
    /// absent and evicting the oldest entry beyond capacity.
    pub fn record_delta(&mut self, key: &str, delta: f64) {
        let window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity + 1));
        window.push_back(delta);
        if window.len() > self.capacity {
            window.pop_front();
        }
    }

    /// Signed sum of the deltas currently in the window for `key`.
    /// Unknown keys read as 0.0. Pure read, no side effects.
    pub fn net_liquidity(&self, key: &str) -> f64 {
        self.windows
            .get(key)
            .map(|w| w.iter().sum())
            .unwrap_or(0.0)
    }

    /// Number of market keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
