//! Helpers for testing code built from programs.
//!
//! Programs are deferred, so the interesting questions in a test are usually
//! "did this run?", "how many times?" and "in what order?". [`Counter`] and
//! [`Journal`] answer those from inside a program, and the assertion macros
//! check outcomes with readable failure messages.
//!
//! # Examples
//!
//! ```rust
//! use slackwater::prelude::*;
//! use slackwater::testing::{run_blocking, Counter};
//! use slackwater::{assert_fails, assert_succeeds};
//!
//! let counter = Counter::new();
//! let program: Program<(), String, u64> = counter.increment_program();
//!
//! assert_succeeds!(run_blocking(program.clone()), 1);
//! assert_eq!(counter.get(), 1);
//!
//! let failing = program.flat_map(|n| fail::<(), _, u64>(format!("saw {n}")));
//! assert_fails!(run_blocking(failing), "saw 2".to_string());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::program::{succeed_lazy, Program};

/// A shared counter for observing how often something ran.
///
/// Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    count: Arc<AtomicU64>,
}

impl Counter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one and return the new count.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The current count.
    pub fn get(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Set the count back to zero.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }

    /// A program that increments the counter each time it runs and yields the
    /// new count.
    pub fn increment_program<R, E>(&self) -> Program<R, E, u64>
    where
        R: 'static,
        E: 'static,
    {
        let counter = self.clone();
        succeed_lazy(move || counter.increment())
    }
}

/// A shared, ordered log of events.
///
/// Clones append to the same log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// A program that appends `entry` each time it runs.
    pub fn record_program<R, E>(&self, entry: impl Into<String>) -> Program<R, E, ()>
    where
        R: 'static,
        E: 'static,
    {
        let journal = self.clone();
        let entry = entry.into();
        succeed_lazy(move || journal.record(entry.clone()))
    }

    /// A snapshot of the entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Run a closed program to completion on the current thread.
///
/// Uses a minimal executor with no timer, so programs that sleep (for example
/// a `repeat` with a spaced schedule) need a tokio runtime instead.
pub fn run_blocking<E, A>(program: Program<(), E, A>) -> Result<A, E>
where
    E: Send + 'static,
    A: Send + 'static,
{
    futures::executor::block_on(program.run(&()))
}

/// Assert that a program outcome is a success, optionally with a given value.
///
/// # Example
///
/// ```rust
/// use slackwater::assert_succeeds;
///
/// let outcome: Result<i32, &str> = Ok(42);
/// assert_succeeds!(outcome);
/// assert_succeeds!(outcome, 42);
/// ```
#[macro_export]
macro_rules! assert_succeeds {
    ($outcome:expr) => {
        match $outcome {
            Ok(_) => {}
            Err(e) => panic!("Expected success, got failure: {:?}", e),
        }
    };
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            Ok(value) => assert_eq!(value, $expected),
            Err(e) => panic!("Expected success, got failure: {:?}", e),
        }
    };
}

/// Assert that a program outcome is a failure, optionally with a given error.
///
/// # Example
///
/// ```rust
/// use slackwater::assert_fails;
///
/// let outcome: Result<i32, &str> = Err("timeout");
/// assert_fails!(outcome);
/// assert_fails!(outcome, "timeout");
/// ```
#[macro_export]
macro_rules! assert_fails {
    ($outcome:expr) => {
        match $outcome {
            Err(_) => {}
            Ok(v) => panic!("Expected failure, got success: {:?}", v),
        }
    };
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            Err(error) => assert_eq!(error, $expected),
            Ok(v) => panic!("Expected failure, got success: {:?}", v),
        }
    };
}
