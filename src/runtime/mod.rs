//! The execution bridge.
//!
//! Programs are inert until something runs them. A [`Runtime`] wraps a tokio
//! runtime and runs closed programs, the ones whose environment has been
//! provided, as tasks:
//!
//! - [`Runtime::execute`] spawns a program and returns an [`Execution`] handle
//! - [`Runtime::block_on`] runs a program to completion from synchronous code
//!
//! Either way the outcome is `Result<A, Fault<E>>`: the program's value, or a
//! [`Fault`] saying whether it failed, panicked or was cancelled.
//!
//! There is no global runtime. Build one at startup, pass it to whatever needs
//! it, and shut it down at the end.
//!
//! # Example
//!
//! ```rust
//! use slackwater::prelude::*;
//! use slackwater::runtime::RuntimeConfig;
//!
//! #[derive(Clone)]
//! struct Config {
//!     greeting: String,
//! }
//!
//! let runtime = RuntimeConfig::current_thread().build().unwrap();
//!
//! let greet = access::<Config, String, _, _>(|c| format!("{}, world", c.greeting))
//!     .provide(Config { greeting: "hello".into() });
//!
//! assert_eq!(runtime.block_on(greet), Ok("hello, world".to_string()));
//! runtime.shutdown();
//! ```

mod config;
mod execution;


use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::{Fault, RuntimeError};
use crate::program::Program;

pub use config::{Flavor, RuntimeConfig};
pub use execution::Execution;

/// Runs closed programs on tokio.
pub struct Runtime {
    handle: Handle,
    owned: Option<tokio::runtime::Runtime>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("owned", &self.owned.is_some())
            .finish()
    }
}

impl Runtime {
    /// Start a runtime with the default configuration.
    pub fn new() -> Result<Self, RuntimeError> {
        RuntimeConfig::default().build()
    }

    /// Use the tokio runtime the caller is already running in.
    ///
    /// The returned runtime does not own the tokio runtime; shutting it down
    /// leaves the underlying runtime running.
    pub fn current() -> Result<Self, RuntimeError> {
        Handle::try_current()
            .map(Runtime::from_handle)
            .map_err(|_| RuntimeError::NoCurrentRuntime)
    }

    /// Use an existing tokio runtime through its handle.
    pub fn from_handle(handle: Handle) -> Self {
        Runtime {
            handle,
            owned: None,
        }
    }

    pub(crate) fn owned(runtime: tokio::runtime::Runtime) -> Self {
        Runtime {
            handle: runtime.handle().clone(),
            owned: Some(runtime),
        }
    }

    /// The underlying tokio handle.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Start running `program` as a task.
    ///
    /// The program runs whether or not the returned [`Execution`] is awaited.
    pub fn execute<E, A>(&self, program: Program<(), E, A>) -> Execution<A, E>
    where
        E: Send + 'static,
        A: Send + 'static,
    {
        #[cfg(feature = "tracing")]
        tracing::trace!(kind = ?program.kind(), "executing program");
        Execution::new(self.handle.spawn(program.run(&())))
    }

    /// Run `program` to completion, blocking the current thread.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async context, like tokio's own
    /// `block_on`.
    pub fn block_on<E, A>(&self, program: Program<(), E, A>) -> Result<A, Fault<E>>
    where
        E: Send + 'static,
        A: Send + 'static,
    {
        let execution = self.execute(program);
        match &self.owned {
            Some(runtime) => runtime.block_on(execution),
            None => self.handle.block_on(execution),
        }
    }

    /// Shut down, waiting for blocking work to finish.
    ///
    /// Running programs are cancelled, so their scopes close and finalizers
    /// run. Does nothing to a runtime that was borrowed with
    /// [`Runtime::current`] or [`Runtime::from_handle`].
    pub fn shutdown(self) {
        if let Some(runtime) = self.owned {
            #[cfg(feature = "tracing")]
            tracing::info!("runtime shutting down");
            drop(runtime);
        }
    }

    /// Shut down, waiting at most `timeout` for blocking work to finish.
    pub fn shutdown_timeout(self, timeout: Duration) {
        if let Some(runtime) = self.owned {
            #[cfg(feature = "tracing")]
            tracing::info!(?timeout, "runtime shutting down");
            runtime.shutdown_timeout(timeout);
        }
    }
}
