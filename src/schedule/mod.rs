//! Recurrence policies for repeating and retrying programs.
//!
//! A [`Schedule<I, O>`] is pure data: it describes, given the latest input,
//! whether to go again, how long to wait first, and what to report. It never
//! runs anything itself. [`Program::repeat`](crate::Program::repeat) feeds it
//! successes and [`Program::retry`](crate::Program::retry) feeds it failures.
//!
//! Every drive of a schedule starts from a fresh state, so one schedule value
//! can be shared between programs and reused across runs.
//!
//! # Built-in schedules
//!
//! - [`Schedule::recurs`] - go again `n` times, reporting the recurrence count
//! - [`Schedule::once`] - go again once
//! - [`Schedule::stop`] - never go again
//! - [`Schedule::spaced`] - go again forever, waiting a fixed delay
//! - [`Schedule::forever`] - go again forever, immediately
//! - [`Schedule::linear`], [`Schedule::exponential`], [`Schedule::fibonacci`] -
//!   go again forever with growing delays
//!
//! Combine them with [`Schedule::both`] (stop as soon as either stops) and
//! [`Schedule::either`] (stop once both stop):
//!
//! ```rust
//! use slackwater::Schedule;
//! use std::time::Duration;
//!
//! // Back off exponentially, at most five times.
//! let policy: Schedule<String, _> = Schedule::exponential(Duration::from_millis(10))
//!     .both(Schedule::recurs(5));
//! # let _ = policy;
//! ```

mod decision;


use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use decision::Decision;

/// A stateful step function for one drive of a schedule.
pub type Driver<I, O> = Box<dyn FnMut(&I) -> Decision<O> + Send>;

/// A recurrence policy consuming inputs of type `I` and reporting `O`.
pub struct Schedule<I, O> {
    start: Arc<dyn Fn() -> Driver<I, O> + Send + Sync>,
}

impl<I, O> Clone for Schedule<I, O> {
    fn clone(&self) -> Self {
        Schedule {
            start: Arc::clone(&self.start),
        }
    }
}

impl<I, O> fmt::Debug for Schedule<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("start", &"<function>")
            .finish()
    }
}

impl<I, O> Schedule<I, O>
where
    I: 'static,
    O: Send + 'static,
{
    /// Build a schedule from an initial state and a step function.
    ///
    /// Each drive clones `initial` and threads it through `step`.
    ///
    /// ```rust
    /// use slackwater::schedule::{Decision, Schedule};
    /// use std::time::Duration;
    ///
    /// // Keep going while the input is below 10.
    /// let below_ten = Schedule::from_fn(0u32, |seen: &mut u32, input: &u32| {
    ///     *seen += 1;
    ///     if *input < 10 {
    ///         Decision::Continue { output: *seen, delay: Duration::ZERO }
    ///     } else {
    ///         Decision::Done(*seen)
    ///     }
    /// });
    ///
    /// let mut driver = below_ten.driver();
    /// assert!(driver(&3).is_continue());
    /// assert_eq!(driver(&12), Decision::Done(2));
    /// ```
    pub fn from_fn<S, F>(initial: S, step: F) -> Self
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(&mut S, &I) -> Decision<O> + Send + Sync + 'static,
    {
        let step = Arc::new(step);
        Schedule {
            start: Arc::new(move || {
                let mut state = initial.clone();
                let step = Arc::clone(&step);
                Box::new(move |input: &I| step(&mut state, input))
            }),
        }
    }

    /// Start a fresh drive of this schedule.
    pub fn driver(&self) -> Driver<I, O> {
        (self.start)()
    }

    /// Transform the reported output.
    pub fn map<O2, F>(self, f: F) -> Schedule<I, O2>
    where
        O2: Send + 'static,
        F: Fn(O) -> O2 + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Schedule {
            start: Arc::new(move || {
                let mut inner = self.driver();
                let f = Arc::clone(&f);
                Box::new(move |input: &I| inner(input).map(|output| f(output)))
            }),
        }
    }

    /// Continue only while both schedules continue, waiting the longer delay.
    pub fn both<O2>(self, other: Schedule<I, O2>) -> Schedule<I, (O, O2)>
    where
        O2: Send + 'static,
    {
        Schedule {
            start: Arc::new(move || {
                let mut left = self.driver();
                let mut right = other.driver();
                Box::new(move |input: &I| {
                    let (l, r) = (left(input), right(input));
                    let proceed = l.is_continue() && r.is_continue();
                    let delay = l.delay().max(r.delay());
                    let output = (l.into_output(), r.into_output());
                    if proceed {
                        Decision::Continue { output, delay }
                    } else {
                        Decision::Done(output)
                    }
                })
            }),
        }
    }

    /// Continue while either schedule continues, waiting the shorter delay.
    ///
    /// Only the delays of schedules that still continue are considered.
    pub fn either<O2>(self, other: Schedule<I, O2>) -> Schedule<I, (O, O2)>
    where
        O2: Send + 'static,
    {
        Schedule {
            start: Arc::new(move || {
                let mut left = self.driver();
                let mut right = other.driver();
                Box::new(move |input: &I| {
                    let (l, r) = (left(input), right(input));
                    let delay = match (l.is_continue(), r.is_continue()) {
                        (true, true) => Some(l.delay().min(r.delay())),
                        (true, false) => Some(l.delay()),
                        (false, true) => Some(r.delay()),
                        (false, false) => None,
                    };
                    let output = (l.into_output(), r.into_output());
                    match delay {
                        Some(delay) => Decision::Continue { output, delay },
                        None => Decision::Done(output),
                    }
                })
            }),
        }
    }

    /// Stop as soon as `predicate` rejects an input.
    ///
    /// Useful with [`Program::retry`](crate::Program::retry) to give up on
    /// errors that are not worth retrying.
    pub fn while_input<P>(self, predicate: P) -> Self
    where
        P: Fn(&I) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Schedule {
            start: Arc::new(move || {
                let mut inner = self.driver();
                let predicate = Arc::clone(&predicate);
                Box::new(move |input: &I| {
                    let decision = inner(input);
                    if predicate(input) {
                        decision
                    } else {
                        Decision::Done(decision.into_output())
                    }
                })
            }),
        }
    }

    /// Add a random amount of jitter to every delay.
    ///
    /// Each delay is scaled by a random factor in `[1 - factor, 1 + factor]`.
    /// `factor` is clamped to `[0, 1]` and a NaN factor means no jitter. A
    /// scaled delay too large for a [`Duration`] saturates at [`Duration::MAX`].
    #[cfg(feature = "jitter")]
    pub fn jittered(self, factor: f64) -> Self {
        use rand::Rng;

        let factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        Schedule {
            start: Arc::new(move || {
                let mut inner = self.driver();
                Box::new(move |input: &I| match inner(input) {
                    Decision::Continue { output, delay } => {
                        let scale = rand::rng().random_range((1.0 - factor)..=(1.0 + factor));
                        Decision::Continue {
                            output,
                            delay: Duration::try_from_secs_f64(delay.as_secs_f64() * scale)
                                .unwrap_or(Duration::MAX),
                        }
                    }
                    done => done,
                })
            }),
        }
    }
}

impl<I> Schedule<I, u64>
where
    I: 'static,
{
    /// Continue forever without waiting, reporting the recurrence count.
    pub fn forever() -> Self {
        Schedule::from_fn(0u64, |count: &mut u64, _: &I| {
            *count += 1;
            Decision::Continue {
                output: *count,
                delay: Duration::ZERO,
            }
        })
    }

    /// Continue while fewer than `n` recurrences have happened.
    ///
    /// Reports the number of recurrences so far, so a program repeated with
    /// `recurs(n)` runs `n + 1` times and yields `n`.
    ///
    /// ```rust
    /// use slackwater::Schedule;
    ///
    /// let mut driver = Schedule::<(), u64>::recurs(2).driver();
    /// assert!(driver(&()).is_continue());
    /// assert!(driver(&()).is_continue());
    /// assert!(!driver(&()).is_continue());
    /// ```
    pub fn recurs(n: u64) -> Self {
        Schedule::from_fn(0u64, move |count: &mut u64, _: &I| {
            if *count < n {
                *count += 1;
                Decision::Continue {
                    output: *count,
                    delay: Duration::ZERO,
                }
            } else {
                Decision::Done(*count)
            }
        })
    }

    /// Continue exactly once.
    pub fn once() -> Self {
        Schedule::recurs(1)
    }

    /// Never continue.
    pub fn stop() -> Self {
        Schedule::recurs(0)
    }

    /// Continue forever, waiting `delay` before every recurrence.
    pub fn spaced(delay: Duration) -> Self {
        Schedule::from_fn(0u64, move |count: &mut u64, _: &I| {
            *count += 1;
            Decision::Continue {
                output: *count,
                delay,
            }
        })
    }
}

impl<I> Schedule<I, Duration>
where
    I: 'static,
{
    /// Continue forever with delays `base`, `2 * base`, `3 * base`, ...
    ///
    /// Reports the delay it asked for.
    pub fn linear(base: Duration) -> Self {
        Schedule::from_fn(0u32, move |step: &mut u32, _: &I| {
            *step = step.saturating_add(1);
            let delay = base.saturating_mul(*step);
            Decision::Continue {
                output: delay,
                delay,
            }
        })
    }

    /// Continue forever with delays `base`, `2 * base`, `4 * base`, ...
    ///
    /// Reports the delay it asked for.
    pub fn exponential(base: Duration) -> Self {
        Schedule::from_fn(0u32, move |step: &mut u32, _: &I| {
            let factor = 2u32.saturating_pow(*step);
            *step = step.saturating_add(1);
            let delay = base.saturating_mul(factor);
            Decision::Continue {
                output: delay,
                delay,
            }
        })
    }

    /// Continue forever with delays following the Fibonacci sequence: `base`,
    /// `base`, `2 * base`, `3 * base`, `5 * base`, ...
    ///
    /// Reports the delay it asked for.
    pub fn fibonacci(base: Duration) -> Self {
        Schedule::from_fn((0u32, 1u32), move |pair: &mut (u32, u32), _: &I| {
            let (previous, current) = *pair;
            *pair = (current, previous.saturating_add(current));
            let delay = base.saturating_mul(current);
            Decision::Continue {
                output: delay,
                delay,
            }
        })
    }
}
