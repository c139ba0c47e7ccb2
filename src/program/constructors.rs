//! Primitive program constructors.
//!
//! Every constructor is generic over the environment it runs in and, where it
//! cannot fail, over the error type too. Fix the error to `Infallible` (or
//! annotate the result as [`NeverFails`](super::NeverFails)) to get a program
//! the compiler knows cannot fail.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::{erase, Node, OpKind, Program};
use crate::error::Panicked;

/// A program that succeeds with `value`.
///
/// The value is cloned on every run.
///
/// ```rust
/// use slackwater::prelude::*;
///
/// # tokio_test::block_on(async {
/// let program: NeverFails<(), i32> = succeed(42);
/// assert_eq!(program.run(&()).await, Ok(42));
/// # });
/// ```
pub fn succeed<R, E, A>(value: A) -> Program<R, E, A>
where
    R: 'static,
    E: 'static,
    A: Clone + Send + Sync + 'static,
{
    Program::from_node(Node::Succeed(Arc::new(move || erase(value.clone()))))
}

/// A program that succeeds with whatever `supplier` returns.
///
/// The supplier is invoked on every run, so side effects repeat with each
/// execution.
///
/// ```rust
/// use slackwater::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counted = Arc::clone(&calls);
/// let program: NeverFails<(), usize> =
///     succeed_lazy(move || counted.fetch_add(1, Ordering::SeqCst) + 1);
///
/// assert_eq!(calls.load(Ordering::SeqCst), 0);
/// assert_eq!(program.run(&()).await, Ok(1));
/// assert_eq!(program.run(&()).await, Ok(2));
/// # });
/// ```
pub fn succeed_lazy<R, E, A, F>(supplier: F) -> Program<R, E, A>
where
    R: 'static,
    E: 'static,
    A: Send + 'static,
    F: Fn() -> A + Send + Sync + 'static,
{
    Program::from_node(Node::Succeed(Arc::new(move || erase(supplier()))))
}

/// A program that succeeds with `()`.
pub fn empty<R, E>() -> Program<R, E, ()>
where
    R: 'static,
    E: 'static,
{
    succeed_lazy(|| ())
}

/// A program that always fails with `error`.
///
/// The success type is chosen by the caller; the program never produces one.
///
/// ```rust
/// use slackwater::prelude::*;
///
/// # tokio_test::block_on(async {
/// let program = fail::<(), _, i32>("error");
/// assert_eq!(program.run(&()).await, Err("error"));
/// # });
/// ```
pub fn fail<R, E, A>(error: E) -> Program<R, E, A>
where
    R: 'static,
    E: Clone + Send + Sync + 'static,
    A: 'static,
{
    Program::from_node(Node::Fail(Arc::new(move || error.clone())))
}

/// A program that fails with whatever `supplier` returns, computed on every run.
pub fn fail_lazy<R, E, A, F>(supplier: F) -> Program<R, E, A>
where
    R: 'static,
    E: 'static,
    F: Fn() -> E + Send + Sync + 'static,
{
    Program::from_node(Node::Fail(Arc::new(supplier)))
}

/// A program that requires `R` and succeeds with the environment itself.
///
/// This is the primitive through which dependencies reach a program.
///
/// ```rust
/// use slackwater::prelude::*;
///
/// # tokio_test::block_on(async {
/// let program = environment::<String, String>().map(|s| s.len());
/// assert_eq!(program.provide("hello".to_string()).run(&()).await, Ok(5));
/// # });
/// ```
pub fn environment<R, E>() -> Program<R, E, R>
where
    R: Clone + Send + Sync + 'static,
    E: 'static,
{
    Program::from_node(Node::Access(Arc::new(|env: &R| erase(env.clone()))))
}

/// A program that reads a projection of the environment.
pub fn access<R, E, A, F>(read: F) -> Program<R, E, A>
where
    R: 'static,
    E: 'static,
    A: Send + 'static,
    F: Fn(&R) -> A + Send + Sync + 'static,
{
    Program::from_node(Node::Access(Arc::new(move |env: &R| erase(read(env)))))
}

/// Wrap a fallible computation, moving its error into the failure channel.
///
/// The computation runs on every execution of the program.
///
/// ```rust
/// use slackwater::prelude::*;
///
/// # tokio_test::block_on(async {
/// let program = attempt::<(), _, _, _>(|| "12".parse::<u8>());
/// assert_eq!(program.run(&()).await, Ok(12));
///
/// let program = attempt::<(), _, _, _>(|| "300".parse::<u8>());
/// assert!(program.run(&()).await.is_err());
/// # });
/// ```
pub fn attempt<R, E, A, F>(computation: F) -> Program<R, E, A>
where
    R: 'static,
    E: 'static,
    A: Send + 'static,
    F: Fn() -> Result<A, E> + Send + Sync + 'static,
{
    Program::from_node(Node::Attempt(Arc::new(move || computation().map(erase))))
}

/// Wrap a computation that may panic, capturing the panic as a [`Panicked`] failure.
///
/// Intended for foreign code that reports problems by panicking. Code that
/// returns `Result` should use [`attempt`] instead.
pub fn attempt_catching<R, A, F>(computation: F) -> Program<R, Panicked, A>
where
    R: 'static,
    A: Send + 'static,
    F: Fn() -> A + Send + Sync + 'static,
{
    Program::from_node(Node::Attempt(Arc::new(move || {
        catch_unwind(AssertUnwindSafe(&computation))
            .map(erase)
            .map_err(Panicked::from_payload)
    })))
}

/// Lift an async computation that reads the environment.
///
/// `f` is called on every run; the future it returns is awaited in place.
///
/// ```rust
/// use slackwater::prelude::*;
///
/// # tokio_test::block_on(async {
/// let program = from_async(|base: &u32| {
///     let base = *base;
///     async move { Ok::<_, String>(base + 1) }
/// });
/// assert_eq!(program.run(&41).await, Ok(42));
/// # });
/// ```
pub fn from_async<R, E, A, F, Fut>(f: F) -> Program<R, E, A>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(&R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    let f = Arc::new(f);
    Program::suspend(OpKind::Async, move |env: R| {
        let f = Arc::clone(&f);
        Box::pin(async move { f(&env).await })
    })
}
