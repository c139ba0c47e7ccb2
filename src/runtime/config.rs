//! Runtime configuration.

use super::Runtime;
use crate::error::RuntimeError;

/// Which tokio scheduler backs a [`Runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Flavor {
    /// Everything runs on the thread that drives the runtime.
    CurrentThread,
    /// A pool of worker threads.
    #[default]
    MultiThread,
}

/// Settings for building a [`Runtime`].
///
/// Configuration is plain data: it can be cloned, compared and, with the
/// `serde` feature, loaded from a file. Nothing starts until
/// [`RuntimeConfig::build`] is called.
///
/// # Examples
///
/// ```rust
/// use slackwater::runtime::{Flavor, RuntimeConfig};
///
/// let config = RuntimeConfig::multi_thread()
///     .with_worker_threads(2)
///     .with_thread_name("orders-worker");
///
/// assert_eq!(config.flavor(), Flavor::MultiThread);
/// assert_eq!(config.worker_threads(), Some(2));
///
/// let runtime = config.build().unwrap();
/// runtime.shutdown();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    flavor: Flavor,
    worker_threads: Option<usize>,
    thread_name: Option<String>,
    enable_time: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flavor: Flavor::default(),
            worker_threads: None,
            thread_name: None,
            enable_time: true,
        }
    }
}

impl RuntimeConfig {
    /// A single-threaded runtime.
    pub fn current_thread() -> Self {
        Self {
            flavor: Flavor::CurrentThread,
            ..Self::default()
        }
    }

    /// A multi-threaded runtime with one worker per core.
    pub fn multi_thread() -> Self {
        Self {
            flavor: Flavor::MultiThread,
            ..Self::default()
        }
    }

    /// Set the number of worker threads. Ignored by the current-thread flavor.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads.max(1));
        self
    }

    /// Name the runtime's threads.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Enable or disable the timer. Schedules with delays need it.
    pub fn with_time(mut self, enabled: bool) -> Self {
        self.enable_time = enabled;
        self
    }

    /// The scheduler flavor.
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// The configured worker thread count, if any.
    pub fn worker_threads(&self) -> Option<usize> {
        self.worker_threads
    }

    /// The configured thread name, if any.
    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }

    /// Whether the timer is enabled.
    pub fn time_enabled(&self) -> bool {
        self.enable_time
    }

    /// Build and start a runtime with these settings.
    pub fn build(&self) -> Result<Runtime, RuntimeError> {
        let mut builder = match self.flavor {
            Flavor::CurrentThread => tokio::runtime::Builder::new_current_thread(),
            Flavor::MultiThread => tokio::runtime::Builder::new_multi_thread(),
        };

        if let (Flavor::MultiThread, Some(threads)) = (self.flavor, self.worker_threads) {
            builder.worker_threads(threads);
        }
        if let Some(name) = &self.thread_name {
            builder.thread_name(name.clone());
        }
        if self.enable_time {
            builder.enable_time();
        }

        let runtime = builder.build()?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            flavor = ?self.flavor,
            worker_threads = ?self.worker_threads,
            "runtime started"
        );

        Ok(Runtime::owned(runtime))
    }
}
