//! Graph analysis algorithms and their shared calculation scaffolding.
//!
//! Long-running calculations periodically invoke a caller-supplied
//! check-and-report callback. The callback sees the current
//! [`Progress`] and answers with a [`Control`]: `Cancel` makes the
//! calculation abort and return [`Outcome::Cancelled`], which is a
//! distinct "did not complete" result rather than an error. Algorithms
//! never leave transient state behind on any exit path: all per-vertex
//! scratch lives in side tables owned by the call.

pub mod reciprocation;
pub mod scc;

pub use reciprocation::{edge_reciprocation, reciprocated_vertex_pair_ratio};
pub use scc::{strongly_connected_components, SortOrder};

/// Number of work units between consecutive cancellation checks.
pub const PROGRESS_INTERVAL: usize = 100;

/// A snapshot of how far a calculation has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Work units completed so far.
    pub completed: usize,
    /// Total work units in the current phase.
    pub total: usize,
    /// Human-readable description of the current phase.
    pub phase: &'static str,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Answer returned by a progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Cancel,
}

/// Result of a cancellable calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The calculation ran to completion.
    Completed(T),
    /// The progress callback asked for cancellation. Not an error.
    Cancelled,
}

impl<T> Outcome<T> {
    /// The completed value, or `None` if the calculation was cancelled.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }
}

/// Accepts any progress and never cancels.
pub fn run_to_completion(_: Progress) -> Control {
    Control::Continue
}
