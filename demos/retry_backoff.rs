//! Retry and repeat with schedules, traced.
//!
//! Run with: cargo run --example retry_backoff

use std::time::Duration;

use slackwater::prelude::*;
use slackwater::testing::Counter;

#[derive(Debug, Clone, PartialEq)]
enum FetchError {
    Unavailable(u64),
    Forbidden,
}

fn flaky_fetch(calls: Counter, healthy_after: u64) -> Program<(), FetchError, String> {
    attempt(move || {
        let n = calls.increment();
        if n <= healthy_after {
            Err(FetchError::Unavailable(n))
        } else {
            Ok(format!("payload after {n} calls"))
        }
    })
    .instrument(tracing::info_span!("fetch"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("could not start runtime: {e}");
            return;
        }
    };

    // Exponential backoff, at most four retries.
    let backoff = Schedule::exponential(Duration::from_millis(20)).both(Schedule::recurs(4));

    let recovered = flaky_fetch(Counter::new(), 2).retry(backoff.clone());
    tracing::info!(result = ?runtime.block_on(recovered), "flaky fetch");

    let exhausted = flaky_fetch(Counter::new(), 10).retry(backoff.clone());
    tracing::info!(result = ?runtime.block_on(exhausted), "always unavailable");

    // Give up immediately on errors that retrying cannot fix.
    let selective = backoff.while_input(|e: &FetchError| matches!(e, FetchError::Unavailable(_)));
    let forbidden = fail::<(), _, String>(FetchError::Forbidden).retry(selective);
    tracing::info!(result = ?runtime.block_on(forbidden), "forbidden");

    // Poll three more times, a little apart.
    let polls = Counter::new();
    let poll: NeverFails<(), u64> = polls.increment_program();
    let polling = poll.repeat(Schedule::spaced(Duration::from_millis(10)).both(Schedule::recurs(3)));
    let result = runtime.block_on(polling);
    tracing::info!(?result, polls = polls.get(), "polling");

    runtime.shutdown_timeout(Duration::from_secs(1));
}
