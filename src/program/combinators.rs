//! Sequencing, mapping, error handling and zipping.

use std::convert::Infallible;
use std::sync::Arc;

use super::{downcast, erase, AnyValue, Continuation, NeverFails, OpKind, Program};

impl<R, E, A> Program<R, E, A>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    /// Run this program, then feed its value to `f` and run the program it returns.
    ///
    /// If this program fails, `f` is never invoked and the failure propagates.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let program = succeed::<(), String, _>("15")
    ///     .flat_map(|s| attempt(move || s.parse::<i32>().map_err(|e| e.to_string())));
    /// assert_eq!(program.run(&()).await, Ok(15));
    /// # });
    /// ```
    pub fn flat_map<B, F>(self, f: F) -> Program<R, E, B>
    where
        B: Send + 'static,
        F: Fn(A) -> Program<R, E, B> + Send + Sync + 'static,
    {
        self.chain(
            OpKind::FlatMap,
            Continuation::FlatMap(Arc::new(move |value: AnyValue| f(downcast::<A>(value)).node)),
        )
    }

    /// Sequence with a continuation that cannot fail.
    ///
    /// The error type of this program is kept as is.
    pub fn flat_map_never_fails<B, F>(self, f: F) -> Program<R, E, B>
    where
        B: Send + 'static,
        F: Fn(A) -> NeverFails<R, B> + Send + Sync + 'static,
    {
        self.flat_map(move |value| f(value).widen_error())
    }

    /// Transform the success value.
    ///
    /// Equivalent to `flat_map(|a| succeed(f(a)))` without requiring `B: Clone`.
    pub fn map<B, F>(self, f: F) -> Program<R, E, B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.chain(
            OpKind::Map,
            Continuation::Map(Arc::new(move |value: AnyValue| erase(f(downcast::<A>(value))))),
        )
    }

    /// Replace the success value with `value`.
    pub fn as_value<B>(self, value: B) -> Program<R, E, B>
    where
        B: Clone + Send + Sync + 'static,
    {
        self.map(move |_| value.clone())
    }

    /// Discard the success value.
    pub fn unit(self) -> Program<R, E, ()> {
        self.as_value(())
    }

    /// Swap the success and failure channels.
    ///
    /// A program that failed with `e` now succeeds with `e`, and a program that
    /// succeeded with `a` now fails with `a`. Flipping twice gives back the
    /// original behavior.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let program = fail::<(), _, i32>("oops").flip();
    /// assert_eq!(program.run(&()).await, Ok("oops"));
    /// # });
    /// ```
    pub fn flip(self) -> Program<R, A, E> {
        Program::suspend(OpKind::Flip, move |env: R| {
            let inner = self.run_owned(env);
            Box::pin(async move {
                match inner.await {
                    Ok(value) => Err(value),
                    Err(error) => Ok(error),
                }
            })
        })
    }

    /// Transform the failure value. Success values pass through untouched.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let program = fail::<(), _, i32>("error").map_error(|e| format!("wrapped: {}", e));
    /// assert_eq!(program.run(&()).await, Err("wrapped: error".to_string()));
    /// # });
    /// ```
    pub fn map_error<E2, F>(self, f: F) -> Program<R, E2, A>
    where
        E2: Send + 'static,
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        self.flip().map(f).flip()
    }

    /// Replace the failure value with the result of a never-failing program.
    pub fn flat_map_error<E2, F>(self, f: F) -> Program<R, E2, A>
    where
        E2: Send + 'static,
        F: Fn(E) -> NeverFails<R, E2> + Send + Sync + 'static,
    {
        self.flip().flat_map_never_fails(f).flip()
    }

    /// Recover from failure with a program that may itself fail with a new error type.
    pub fn or_else<E2, F>(self, f: F) -> Program<R, E2, A>
    where
        E2: Send + 'static,
        F: Fn(E) -> Program<R, E2, A> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Program::suspend(OpKind::CatchAll, move |env: R| {
            let inner = self.run_owned(env.clone());
            let f = Arc::clone(&f);
            Box::pin(async move {
                match inner.await {
                    Ok(value) => Ok(value),
                    Err(error) => f(error).run_owned(env).await,
                }
            })
        })
    }

    /// Recover from every failure, producing a program that cannot fail.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let program = fail::<(), _, i32>("42")
    ///     .catch_all(|s| succeed(s.parse::<i32>().unwrap_or_default()));
    /// assert_eq!(program.run(&()).await, Ok(42));
    /// # });
    /// ```
    pub fn catch_all<F>(self, f: F) -> NeverFails<R, A>
    where
        F: Fn(E) -> NeverFails<R, A> + Send + Sync + 'static,
    {
        self.or_else::<Infallible, F>(f)
    }

    /// Run this program, then `that`, and pair their values.
    ///
    /// Execution is sequential. The first failure wins and `that` does not run
    /// if this program fails.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let program = succeed::<(), String, _>(42).zip(succeed("hello"));
    /// assert_eq!(program.run(&()).await, Ok((42, "hello")));
    /// # });
    /// ```
    pub fn zip<B>(self, that: Program<R, E, B>) -> Program<R, E, (A, B)>
    where
        B: Send + 'static,
    {
        self.zip_with(that, |a, b| (a, b))
    }

    /// Run this program, then `that`, and combine their values with `f`.
    pub fn zip_with<B, C, F>(self, that: Program<R, E, B>, f: F) -> Program<R, E, C>
    where
        B: Send + 'static,
        C: Send + 'static,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Program::suspend(OpKind::Zip, move |env: R| {
            let first = self.run_owned(env.clone());
            let second = that.run_owned(env);
            let f = Arc::clone(&f);
            Box::pin(async move {
                let a = first.await?;
                let b = second.await?;
                Ok(f(a, b))
            })
        })
    }
}
