//! Round-robin batch windows for incremental population updates.
//!
//! At a million citizens, updating everyone every tick is prohibitive. Each
//! tick instead processes one window of at most `batch_size` consecutive
//! citizens starting at a persistent cursor, wrapping to the start of the
//! population within the same tick. Over `ceil(N / B)` ticks every citizen
//! is visited exactly once.
//!
//! ```
//! use civsim_logic::batch::BatchWindow;
//!
//! // 10 citizens, batch of 4: [0..4], [4..8], then [8, 9, 0, 1]
//! let w = BatchWindow::plan(8, 10, 4);
//! assert_eq!(w.head(), 8..10);
//! assert_eq!(w.tail(), 0..2);
//! assert_eq!(w.next_cursor(), 2);
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// The citizens a single tick will process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchWindow {
    /// First dense index processed.
    pub start: usize,
    /// Number of citizens processed, `min(batch_size, population)`.
    pub len: usize,
    /// Population size the window was planned against.
    pub population: usize,
}

impl BatchWindow {
    /// Plan the window for this tick.
    ///
    /// A cursor at or past the end (after removals) restarts at 0.
    pub fn plan(cursor: usize, population: usize, batch_size: usize) -> Self {
        let start = if cursor >= population { 0 } else { cursor };
        Self {
            start,
            len: batch_size.min(population),
            population,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The contiguous part from `start` toward the end.
    pub fn head(&self) -> Range<usize> {
        self.start..(self.start + self.len).min(self.population)
    }

    /// The wrapped part from index 0, empty when nothing wraps.
    pub fn tail(&self) -> Range<usize> {
        let head_len = self.head().len();
        0..self.len - head_len
    }

    /// Cursor for the next tick.
    pub fn next_cursor(&self) -> usize {
        if self.population == 0 {
            0
        } else {
            (self.start + self.len) % self.population
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.head().contains(&index) || self.tail().contains(&index)
    }

    /// Dense indices in processing order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        self.head().chain(self.tail())
    }
}

/// Ticks needed to visit every citizen once.
pub fn sweep_ticks(population: usize, batch_size: usize) -> usize {
    if population == 0 || batch_size == 0 {
        0
    } else {
        population.div_ceil(batch_size)
    }
}

/// Per-tick processing cost summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchCost {
    pub processed: usize,
    pub total_nanos: u64,
    pub max_nanos: u64,
}

impl BatchCost {
    pub fn record(&mut self, nanos: u64) {
        self.processed += 1;
        self.total_nanos += nanos;
        self.max_nanos = self.max_nanos.max(nanos);
    }

    pub fn merge(mut self, other: BatchCost) -> BatchCost {
        self.processed += other.processed;
        self.total_nanos += other.total_nanos;
        self.max_nanos = self.max_nanos.max(other.max_nanos);
        self
    }

    /// Mean nanoseconds per citizen.
    pub fn average_nanos(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.total_nanos as f64 / self.processed as f64
        }
    }
}
