//! # Slackwater
//!
//! Typed, deferred programs with dependency injection, scoped resources and
//! schedule-driven repetition.
//!
//! A [`Program<R, E, A>`] describes a computation that needs an environment
//! `R`, may fail with `E` and succeeds with `A`. Building and combining
//! programs runs nothing; a [`Runtime`] runs them once their environment has
//! been provided.
//!
//! ## Quick Example
//!
//! ```rust
//! use slackwater::prelude::*;
//! use std::time::Duration;
//!
//! #[derive(Clone)]
//! struct Config {
//!     endpoint: String,
//!     retries: u64,
//! }
//!
//! fn fetch() -> Program<Config, String, String> {
//!     access(|c: &Config| c.endpoint.clone()).flat_map(|endpoint| {
//!         attempt(move || {
//!             if endpoint.starts_with("https://") {
//!                 Ok(format!("fetched {endpoint}"))
//!             } else {
//!                 Err(format!("refusing insecure endpoint {endpoint}"))
//!             }
//!         })
//!     })
//! }
//!
//! let config = Config {
//!     endpoint: "https://example.com".to_string(),
//!     retries: 3,
//! };
//! let policy = Schedule::spaced(Duration::from_millis(5)).both(Schedule::recurs(config.retries));
//! let program = fetch().retry(policy).provide(config);
//!
//! let runtime = Runtime::new().unwrap();
//! assert_eq!(
//!     runtime.block_on(program),
//!     Ok("fetched https://example.com".to_string())
//! );
//! runtime.shutdown();
//! ```
//!
//! ## Modules
//!
//! - [`program`] - the program type, its constructors and combinators
//! - [`schedule`] - recurrence policies for `repeat` and `retry`
//! - [`scope`] - finalizer scopes and scoped resources
//! - [`runtime`] - running closed programs on tokio
//! - [`error`] - faults surfaced at the edges
//! - [`testing`] - counters, journals and assertion macros for tests
//!
//! ## Features
//!
//! - `tracing` (default) - log notable events and instrument programs with spans
//! - `jitter` - randomized schedule delays
//! - `serde` - serialize runtime configuration and schedule decisions

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod program;
pub mod runtime;
pub mod schedule;
pub mod scope;
pub mod testing;

// Re-exports
pub use error::{Fault, Panicked, RuntimeError};
pub use program::{
    access, attempt, attempt_catching, empty, environment, fail, fail_lazy, from_async,
    succeed, succeed_lazy, NeverFails, Program,
};
pub use runtime::{Execution, Runtime, RuntimeConfig};
pub use schedule::{Decision, Schedule};
pub use scope::{
    acquire_release, acquire_release_with, scoped, scoped_env, scoped_with, HasScope, Scope,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Fault, Panicked};
    pub use crate::program::{
        access, attempt, attempt_catching, empty, environment, fail, fail_lazy, from_async,
        succeed, succeed_lazy, NeverFails, Program,
    };
    pub use crate::runtime::Runtime;
    pub use crate::schedule::Schedule;
    pub use crate::scope::{
        acquire_release, acquire_release_with, scoped, scoped_env, scoped_with, HasScope, Scope,
    };
}
