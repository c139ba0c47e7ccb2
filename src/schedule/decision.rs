//! The answer a schedule gives after each input.

use std::time::Duration;

/// Whether to go again, and what the schedule reports.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision<O> {
    /// Go again after waiting `delay`.
    Continue {
        /// The value reported so far.
        output: O,
        /// How long to wait before the next iteration.
        delay: Duration,
    },
    /// Stop, reporting a final value.
    Done(O),
}

impl<O> Decision<O> {
    /// Whether the schedule wants another iteration.
    pub fn is_continue(&self) -> bool {
        matches!(self, Decision::Continue { .. })
    }

    /// The requested wait; zero once the schedule is done.
    pub fn delay(&self) -> Duration {
        match self {
            Decision::Continue { delay, .. } => *delay,
            Decision::Done(_) => Duration::ZERO,
        }
    }

    /// The reported value.
    pub fn output(&self) -> &O {
        match self {
            Decision::Continue { output, .. } | Decision::Done(output) => output,
        }
    }

    /// Consume the decision, keeping only the reported value.
    pub fn into_output(self) -> O {
        match self {
            Decision::Continue { output, .. } | Decision::Done(output) => output,
        }
    }

    /// Transform the reported value, keeping the decision.
    pub fn map<O2, F>(self, f: F) -> Decision<O2>
    where
        F: FnOnce(O) -> O2,
    {
        match self {
            Decision::Continue { output, delay } => Decision::Continue {
                output: f(output),
                delay,
            },
            Decision::Done(output) => Decision::Done(f(output)),
        }
    }
}
