//! Resource scopes.
//!
//! A [`Scope`] owns an ordered list of finalizers: never-failing cleanup
//! programs that run, last registered first, when the scope closes. Scopes
//! are usually created and closed for you by [`scoped`] and friends, which
//! guarantee the close happens however the scoped program ends: success,
//! failure, panic or cancellation.
//!
//! [`acquire_release`] ties a resource's release to the scope found in the
//! environment, registering it the moment acquisition succeeds.
//!
//! # Example
//!
//! ```rust
//! use slackwater::prelude::*;
//! use slackwater::testing::Journal;
//!
//! # tokio_test::block_on(async {
//! let journal = Journal::new();
//! let log = journal.clone();
//!
//! let open = |name: &'static str, log: Journal| {
//!     let on_release = log.clone();
//!     acquire_release(
//!         log.record_program(format!("open {name}")).as_value(name),
//!         move |name: &&'static str| on_release.record_program(format!("close {name}")),
//!     )
//! };
//!
//! let program = open("db", log.clone())
//!     .zip(open("cache", log.clone()))
//!     .flat_map(move |_| log.record_program("work"));
//!
//! let result: Result<(), String> = scoped(program).run(&()).await;
//! assert!(result.is_ok());
//! assert_eq!(
//!     journal.entries(),
//!     vec!["open db", "open cache", "work", "close cache", "close db"]
//! );
//! # });
//! ```
//!
//! # Late registration
//!
//! A finalizer added to a scope that has already closed is not kept: it runs
//! immediately and a warning is logged.
//!
//! # Cancellation
//!
//! If a scoped program is dropped before it completes, for example because its
//! [`Execution`](crate::runtime::Execution) was cancelled, the scope is closed
//! as part of the drop. A finalizer that was already running resumes where it
//! stopped instead of being abandoned.
//!
//! How the drop waits for the remaining finalizers depends on where it happens:
//! - on a multi-threaded tokio runtime it blocks the worker in place
//! - on a current-thread runtime the close continues on a spawned task, so the
//!   finalizers finish shortly after the drop rather than during it
//! - outside any runtime it blocks the dropping thread

mod resource;

use std::fmt;
use std::future::{poll_fn, Future};
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::Panicked;
use crate::program::{BoxFuture, NeverFails, OpKind, Program};

pub use resource::{acquire_release, acquire_release_with, scoped, scoped_env, scoped_with};

struct ScopeState {
    finalizers: Vec<NeverFails<(), ()>>,
    /// Finalizers that have started and were suspended mid-run.
    in_flight: Vec<BoxFuture<'static, ()>>,
    closed: bool,
}

/// A lifetime boundary owning an ordered list of finalizers.
///
/// `Scope` is a cheap handle; clones refer to the same scope.
#[derive(Clone)]
pub struct Scope {
    state: Arc<Mutex<ScopeState>>,
}

/// Capability trait for environments that carry a [`Scope`].
///
/// ```rust
/// use slackwater::scope::{HasScope, Scope};
///
/// #[derive(Clone)]
/// struct Services {
///     scope: Scope,
///     database_url: String,
/// }
///
/// impl HasScope for Services {
///     fn scope(&self) -> &Scope {
///         &self.scope
///     }
/// }
/// ```
pub trait HasScope {
    /// The scope finalizers should be registered on.
    fn scope(&self) -> &Scope;
}

impl HasScope for Scope {
    fn scope(&self) -> &Scope {
        self
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Scope")
            .field("closed", &state.closed)
            .field("finalizers", &state.finalizers.len())
            .finish()
    }
}

impl Scope {
    pub(crate) fn new() -> Self {
        Scope {
            state: Arc::new(Mutex::new(ScopeState {
                finalizers: Vec::new(),
                in_flight: Vec::new(),
                closed: false,
            })),
        }
    }

    /// A program that creates a new, open scope with no finalizers.
    ///
    /// A scope made this way is managed by hand: remember to run
    /// [`Scope::close`] on it.
    pub fn make<R, E>() -> Program<R, E, Scope>
    where
        R: 'static,
        E: 'static,
    {
        crate::program::succeed_lazy(Scope::new)
    }

    /// A program that registers `finalizer` to run when this scope closes.
    ///
    /// Every run appends another registration.
    pub fn add_finalizer<R, E>(&self, finalizer: NeverFails<(), ()>) -> Program<R, E, ()>
    where
        R: Clone + Send + Sync + 'static,
        E: Send + 'static,
    {
        let scope = self.clone();
        Program::suspend(OpKind::AddFinalizer, move |_: R| {
            let scope = scope.clone();
            let finalizer = finalizer.clone();
            Box::pin(async move {
                scope.register(finalizer).await;
                Ok(())
            })
        })
    }

    /// A program that closes this scope, running its finalizers in reverse
    /// registration order.
    ///
    /// Closing an already closed scope does nothing.
    pub fn close<R, E>(&self) -> Program<R, E, ()>
    where
        R: Clone + Send + Sync + 'static,
        E: Send + 'static,
    {
        let scope = self.clone();
        Program::suspend(OpKind::CloseScope, move |_: R| {
            let scope = scope.clone();
            Box::pin(async move {
                scope.close_now().await;
                Ok(())
            })
        })
    }

    /// Whether this scope has started closing.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// The number of finalizers waiting for the scope to close.
    pub fn finalizer_count(&self) -> usize {
        self.state.lock().finalizers.len()
    }

    /// Append a finalizer, or run it at once if the scope is already closed.
    ///
    /// The append happens on the first poll, before any await point.
    pub(crate) async fn register(&self, finalizer: NeverFails<(), ()>) {
        let late = {
            let mut state = self.state.lock();
            if state.closed {
                Some(finalizer)
            } else {
                state.finalizers.push(finalizer);
                None
            }
        };

        if let Some(finalizer) = late {
            #[cfg(feature = "tracing")]
            tracing::warn!("finalizer registered on a closed scope, running it now");
            #[cfg(not(feature = "tracing"))]
            eprintln!("finalizer registered on a closed scope, running it now");
            run_finalizer(finalizer).await;
        }
    }

    /// Mark the scope closed and drain its finalizers, newest first.
    ///
    /// A running finalizer lives in the scope rather than in this future, so a
    /// close that is interrupted can be resumed by calling this again and picks
    /// up the same finalizer where it stopped.
    pub(crate) async fn close_now(&self) {
        {
            let mut state = self.state.lock();
            if !state.closed {
                state.closed = true;
                #[cfg(feature = "tracing")]
                tracing::debug!(finalizers = state.finalizers.len(), "closing scope");
            }
        }

        while poll_fn(|cx| self.poll_finalizer(cx)).await {}
    }

    /// Drive one finalizer, resuming a suspended one before starting the next.
    ///
    /// Ready(true) when a finalizer completed, Ready(false) when none is left.
    /// The lock is not held while the finalizer is polled, since a finalizer may
    /// register on this very scope.
    fn poll_finalizer(&self, cx: &mut Context<'_>) -> Poll<bool> {
        let mut running = {
            let mut state = self.state.lock();
            match state.in_flight.pop() {
                Some(running) => running,
                None => match state.finalizers.pop() {
                    Some(finalizer) => run_finalizer(finalizer).boxed(),
                    None => return Poll::Ready(false),
                },
            }
        };

        match running.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(true),
            Poll::Pending => {
                self.state.lock().in_flight.push(running);
                Poll::Pending
            }
        }
    }

    fn has_pending_work(&self) -> bool {
        let state = self.state.lock();
        !state.closed || !state.in_flight.is_empty() || !state.finalizers.is_empty()
    }
}

/// Run one finalizer to completion. A panic is logged, never propagated.
async fn run_finalizer(finalizer: NeverFails<(), ()>) {
    if let Err(payload) = AssertUnwindSafe(finalizer.run(&())).catch_unwind().await {
        let panicked = Panicked::from_payload(payload);
        #[cfg(feature = "tracing")]
        tracing::error!(error = %panicked, "finalizer panicked");
        #[cfg(not(feature = "tracing"))]
        eprintln!("finalizer panicked: {}", panicked);
    }
}

/// Closes a scope when dropped, unless it was already closed.
///
/// Keeps the close on every exit path of a scoped run, including the future
/// being dropped mid-flight and unwinding from a panic.
pub(crate) struct CloseOnDrop {
    scope: Scope,
}

impl CloseOnDrop {
    pub(crate) fn new(scope: Scope) -> Self {
        CloseOnDrop { scope }
    }

    pub(crate) async fn close(self) {
        self.scope.close_now().await;
    }
}

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        if !self.scope.has_pending_work() {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("scoped program dropped before completion, closing scope");

        // Finalizers that never wait finish here without touching the runtime.
        let finished = {
            let close = pin!(self.scope.close_now());
            let mut cx = Context::from_waker(futures::task::noop_waker_ref());
            close.poll(&mut cx).is_ready()
        };
        if !finished {
            finish_close_blocking(self.scope.clone());
        }
    }
}

/// Finish closing a scope from synchronous code.
fn finish_close_blocking(scope: Scope) {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(scope.close_now()));
        }
        Ok(handle) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("scope dropped on a current-thread runtime, finishing close on a task");
            #[cfg(not(feature = "tracing"))]
            eprintln!("scope dropped on a current-thread runtime, finishing close on a task");
            handle.spawn(async move { scope.close_now().await });
        }
        Err(_) => futures::executor::block_on(scope.close_now()),
    }
}

#[cfg(test)]
mod tests;
