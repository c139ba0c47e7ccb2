//! Handles to running programs.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::{JoinError, JoinHandle};

use crate::error::{Fault, Panicked};

/// A program running on a [`Runtime`](super::Runtime).
///
/// Await it to get the program's outcome. Dropping an `Execution` detaches it;
/// the program keeps running.
#[must_use = "an execution does nothing to its program when dropped; await or cancel it"]
pub struct Execution<A, E> {
    task: JoinHandle<Result<A, E>>,
}

impl<A, E> Execution<A, E> {
    pub(crate) fn new(task: JoinHandle<Result<A, E>>) -> Self {
        Execution { task }
    }

    /// Request cancellation.
    ///
    /// The program is dropped at its next await point, which closes any scope
    /// it holds and runs the remaining finalizers, including one that was
    /// mid-run. Awaiting the execution then yields [`Fault::Cancelled`], unless
    /// it had already finished.
    ///
    /// On a multi-threaded runtime the finalizers have finished by the time the
    /// execution resolves. On a current-thread runtime a finalizer that waits on
    /// a timer or on I/O cannot be driven while the program is being dropped, so
    /// the rest of the close continues on a spawned task and may still be
    /// running when the execution resolves.
    pub fn cancel(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!("cancelling execution");
        self.task.abort();
    }

    /// Whether the program has finished, by any path.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<A, E> fmt::Debug for Execution<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl<A, E> Future for Execution<A, E> {
    type Output = Result<A, Fault<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(Fault::Failed(error)),
            Err(join_error) => Err(fault_from_join(join_error)),
        })
    }
}

fn fault_from_join<E>(error: JoinError) -> Fault<E> {
    if error.is_panic() {
        let panicked = Panicked::from_payload(error.into_panic());
        #[cfg(feature = "tracing")]
        tracing::error!(error = %panicked, "program panicked");
        Fault::Panicked(panicked)
    } else {
        Fault::Cancelled
    }
}
