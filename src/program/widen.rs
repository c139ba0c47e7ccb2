//! Widening conversions.
//!
//! These change what a program is declared to produce, never what it does.
//! Each one names its target type explicitly; nothing here reinterprets a value.

use std::convert::Infallible;
use std::sync::Arc;

use super::{AnyValue, BoxFuture, Continuation, Node, Program};

impl<R, A> Program<R, Infallible, A>
where
    R: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    /// Treat a never-failing program as one that may fail with `E`.
    ///
    /// Primitive nodes keep their shape, so [`Program::kind`] is unchanged.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let total: NeverFails<(), i32> = succeed(1);
    /// let checked = total.widen_error::<String>().flat_map(|n| {
    ///     if n > 0 { succeed(n) } else { fail("not positive".to_string()) }
    /// });
    /// assert_eq!(checked.run(&()).await, Ok(1));
    /// # });
    /// ```
    pub fn widen_error<E>(self) -> Program<R, E, A>
    where
        E: Send + 'static,
    {
        Program::from_node(widen_node(self.node))
    }
}

/// Rebuild a never-failing node with another error type, keeping its shape.
fn widen_node<R, E>(node: Node<R, Infallible>) -> Node<R, E>
where
    R: Send + 'static,
    E: Send + 'static,
{
    match node {
        Node::Succeed(thunk) => Node::Succeed(thunk),
        Node::Access(read) => Node::Access(read),
        Node::Fail(thunk) => Node::Fail(Arc::new(move || -> E { match thunk() {} })),
        Node::Attempt(thunk) => Node::Attempt(Arc::new(move || -> Result<AnyValue, E> {
            thunk().map_err(|never| match never {})
        })),
        Node::Chain { kind, source, then } => Node::Chain {
            kind,
            source: Arc::new(widen_node(Node::clone(&source))),
            then: match then {
                Continuation::Map(f) => Continuation::Map(f),
                Continuation::FlatMap(f) => Continuation::FlatMap(Arc::new(
                    move |value: AnyValue| -> Node<R, E> { widen_node(f(value)) },
                )),
            },
        },
        Node::Suspend { kind, step } => Node::Suspend {
            kind,
            step: Arc::new(move |env: R| -> BoxFuture<'static, Result<AnyValue, E>> {
                let run = step(env);
                Box::pin(async move { run.await.map_err(|never| match never {}) })
            }),
        },
    }
}

impl<R, E, A> Program<R, E, A>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    /// Convert the failure into a broader error type through `Into`.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// #[derive(Debug, PartialEq)]
    /// enum AppError {
    ///     Io(String),
    /// }
    ///
    /// impl From<String> for AppError {
    ///     fn from(e: String) -> Self {
    ///         AppError::Io(e)
    ///     }
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let program = fail::<(), _, i32>("disk".to_string()).err_into::<AppError>();
    /// assert_eq!(program.run(&()).await, Err(AppError::Io("disk".to_string())));
    /// # });
    /// ```
    pub fn err_into<E2>(self) -> Program<R, E2, A>
    where
        E: Into<E2>,
        E2: Send + 'static,
    {
        self.map_error(Into::into)
    }

    /// Convert the success value into a broader type through `Into`.
    pub fn map_into<A2>(self) -> Program<R, E, A2>
    where
        A: Into<A2>,
        A2: Send + 'static,
    {
        self.map(Into::into)
    }
}
