//! Error types surfaced at the edges of a program.
//!
//! Domain failures travel through a program's own error channel `E`. The types
//! here cover what is left over:
//!
//! - [`Panicked`] - a panic captured by [`attempt_catching`](crate::attempt_catching)
//!   or raised by a task the runtime was driving
//! - [`Fault`] - the terminal outcome of a program executed by the
//!   [`Runtime`](crate::Runtime)
//! - [`RuntimeError`] - the runtime could not be built or located

use std::any::Any;
use std::fmt;

/// A panic captured and turned into a value.
///
/// # Examples
///
/// ```rust
/// use slackwater::prelude::*;
///
/// # tokio_test::block_on(async {
/// let program = attempt_catching::<(), i32, _>(|| panic!("boom"));
/// let error = program.run(&()).await.unwrap_err();
/// assert_eq!(error.message(), "boom");
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panicked {
    message: String,
}

impl Panicked {
    /// Create a `Panicked` carrying the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extract a readable message from a panic payload.
    ///
    /// `panic!` payloads are either `&'static str` or `String`; anything else
    /// is reported as an opaque panic.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "<non-string panic payload>".to_string(),
            },
        };
        Self { message }
    }

    /// The panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panicked: {}", self.message)
    }
}

impl std::error::Error for Panicked {}

/// Terminal outcome of a program that did not succeed.
///
/// Returned by [`Runtime::block_on`](crate::Runtime::block_on) and by awaiting
/// an [`Execution`](crate::runtime::Execution).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault<E> {
    /// The program failed with its own typed error.
    Failed(E),
    /// The task driving the program panicked.
    Panicked(Panicked),
    /// The execution was cancelled before it completed.
    Cancelled,
}

impl<E> Fault<E> {
    /// The typed failure, if this fault is one.
    pub fn failure(&self) -> Option<&E> {
        match self {
            Fault::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Consume the fault, returning the typed failure if there is one.
    pub fn into_failure(self) -> Option<E> {
        match self {
            Fault::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the execution was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Fault::Cancelled)
    }

    /// Transform the typed failure, keeping the other variants.
    pub fn map<F, E2>(self, f: F) -> Fault<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Fault::Failed(e) => Fault::Failed(f(e)),
            Fault::Panicked(p) => Fault::Panicked(p),
            Fault::Cancelled => Fault::Cancelled,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Fault<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Failed(e) => write!(f, "program failed: {}", e),
            Fault::Panicked(p) => write!(f, "program {}", p),
            Fault::Cancelled => write!(f, "program was cancelled"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Fault<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Fault::Failed(e) => Some(e),
            Fault::Panicked(p) => Some(p),
            Fault::Cancelled => None,
        }
    }
}

/// Error raised while building or locating a [`Runtime`](crate::Runtime).
#[derive(Debug)]
pub enum RuntimeError {
    /// The underlying tokio runtime could not be built.
    Build(std::io::Error),
    /// [`Runtime::current`](crate::Runtime::current) was called outside a tokio runtime.
    NoCurrentRuntime,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Build(e) => write!(f, "failed to build runtime: {}", e),
            RuntimeError::NoCurrentRuntime => {
                write!(f, "no tokio runtime is running on this thread")
            }
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Build(e) => Some(e),
            RuntimeError::NoCurrentRuntime => None,
        }
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(error: std::io::Error) -> Self {
        RuntimeError::Build(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panicked_from_str_payload() {
        let payload = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(Panicked::from_payload(payload).message(), "static message");
    }

    #[test]
    fn test_panicked_from_string_payload() {
        let payload = std::panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(Panicked::from_payload(payload).message(), "formatted 42");
    }

    #[test]
    fn test_panicked_from_opaque_payload() {
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(
            Panicked::from_payload(payload).message(),
            "<non-string panic payload>"
        );
    }

    #[test]
    fn test_fault_display() {
        assert_eq!(
            Fault::Failed("disk full").to_string(),
            "program failed: disk full"
        );
        assert_eq!(
            Fault::<&str>::Panicked(Panicked::new("boom")).to_string(),
            "program panicked: boom"
        );
        assert_eq!(
            Fault::<&str>::Cancelled.to_string(),
            "program was cancelled"
        );
    }

    #[test]
    fn test_fault_map_keeps_non_failures() {
        assert_eq!(Fault::Failed(2).map(|x| x * 10), Fault::Failed(20));
        assert_eq!(Fault::<i32>::Cancelled.map(|x| x * 10), Fault::Cancelled);
        assert!(Fault::<i32>::Cancelled.failure().is_none());
        assert_eq!(Fault::Failed("e").into_failure(), Some("e"));
    }

    #[test]
    fn test_runtime_error_source() {
        use std::error::Error;

        let error = RuntimeError::from(std::io::Error::other("no threads"));
        assert!(error.source().is_some());
        assert!(error.to_string().contains("no threads"));
        assert!(RuntimeError::NoCurrentRuntime.source().is_none());
    }
}
