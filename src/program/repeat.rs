//! Schedule-driven repetition.
//!
//! Both loops start a fresh schedule drive on every run, so a repeated program
//! can itself be run again and will follow the whole policy from the start.

use std::time::Duration;

use super::{OpKind, Program};
use crate::schedule::{Decision, Schedule};

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl<R, E, A> Program<R, E, A>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    /// Run once, then run again after every success while `schedule` continues.
    ///
    /// The final value is the schedule's output when it stops. A failure in
    /// any iteration ends the loop and is reported unchanged.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    /// use slackwater::testing::Counter;
    ///
    /// # tokio_test::block_on(async {
    /// let counter = Counter::new();
    /// let program: NeverFails<(), u64> = counter.increment_program();
    ///
    /// let repeated = program.repeat(Schedule::recurs(2));
    /// assert_eq!(repeated.run(&()).await, Ok(2));
    /// assert_eq!(counter.get(), 3);
    /// # });
    /// ```
    pub fn repeat<B>(self, schedule: Schedule<A, B>) -> Program<R, E, B>
    where
        B: Send + 'static,
    {
        Program::suspend(OpKind::Repeat, move |env: R| {
            let this = self.clone();
            let mut driver = schedule.driver();
            Box::pin(async move {
                let mut iteration = 0u64;
                loop {
                    let value = this.run_owned(env.clone()).await?;
                    iteration += 1;
                    match driver(&value) {
                        Decision::Continue { delay, .. } => {
                            #[cfg(feature = "tracing")]
                            tracing::trace!(iteration, ?delay, "repeating program");
                            pause(delay).await;
                        }
                        Decision::Done(output) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(iterations = iteration, "repeat schedule finished");
                            return Ok(output);
                        }
                    }
                }
            })
        })
    }

    /// Run once, then run again after every failure while `schedule` continues.
    ///
    /// When the schedule stops, the most recent failure is reported. A success
    /// in any attempt ends the loop.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    /// use slackwater::testing::Counter;
    ///
    /// # tokio_test::block_on(async {
    /// let counter = Counter::new();
    /// let tally = counter.clone();
    /// let flaky: Program<(), String, u64> = attempt(move || {
    ///     let n = tally.increment();
    ///     if n < 3 { Err(format!("attempt {n} failed")) } else { Ok(n) }
    /// });
    ///
    /// assert_eq!(flaky.retry(Schedule::recurs(5)).run(&()).await, Ok(3));
    /// # });
    /// ```
    pub fn retry<B>(self, schedule: Schedule<E, B>) -> Program<R, E, A>
    where
        B: Send + 'static,
    {
        Program::suspend(OpKind::Retry, move |env: R| {
            let this = self.clone();
            let mut driver = schedule.driver();
            Box::pin(async move {
                let mut attempt = 0u64;
                loop {
                    attempt += 1;
                    let error = match this.run_owned(env.clone()).await {
                        Ok(value) => return Ok(value),
                        Err(error) => error,
                    };
                    match driver(&error) {
                        Decision::Continue { delay, .. } => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(attempt, ?delay, "attempt failed, retrying");
                            pause(delay).await;
                        }
                        Decision::Done(_) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(attempts = attempt, "retry schedule exhausted");
                            return Err(error);
                        }
                    }
                }
            })
        })
    }
}
