//! Integration tests for schedule-driven repeat and retry.

use std::time::Duration;

use slackwater::prelude::*;
use slackwater::schedule::Decision;
use slackwater::testing::{Counter, Journal};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
enum ServiceError {
    Busy(u64),
    Rejected,
}

fn busy_until(calls: Counter, healthy_after: u64) -> Program<(), ServiceError, u64> {
    attempt(move || {
        let n = calls.increment();
        if n <= healthy_after {
            Err(ServiceError::Busy(n))
        } else {
            Ok(n)
        }
    })
}

#[tokio::test(start_paused = true)]
async fn retry_with_capped_exponential_backoff() {
    let calls = Counter::new();
    let policy = Schedule::exponential(Duration::from_millis(100)).both(Schedule::recurs(5));
    let program = busy_until(calls.clone(), 3).retry(policy);

    let start = Instant::now();
    let result = program.run(&()).await;

    assert_eq!(result, Ok(4));
    assert_eq!(calls.get(), 4);
    // 100 + 200 + 400
    assert!(start.elapsed() >= Duration::from_millis(700));
    assert!(start.elapsed() < Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn retry_gives_up_when_attempts_run_out() {
    let calls = Counter::new();
    let policy = Schedule::spaced(Duration::from_millis(10)).both(Schedule::recurs(2));

    let result = busy_until(calls.clone(), 100).retry(policy).run(&()).await;

    assert_eq!(result, Err(ServiceError::Busy(3)));
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn retry_stops_on_errors_the_schedule_rejects() {
    let calls = Counter::new();
    let tally = calls.clone();
    let program = attempt(move || {
        if tally.increment() == 1 {
            Err(ServiceError::Busy(1))
        } else {
            Err::<u64, _>(ServiceError::Rejected)
        }
    });

    let policy = Schedule::forever().while_input(|e: &ServiceError| matches!(e, ServiceError::Busy(_)));
    let result = program.retry(policy).run(&()).await;

    assert_eq!(result, Err(ServiceError::Rejected));
    assert_eq!(calls.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn repeat_polls_until_condition_holds() {
    let polls = Counter::new();
    let poll: NeverFails<(), u64> = polls.increment_program();

    let until_five = Schedule::<u64, u64>::from_fn((), |_, n: &u64| {
        if *n < 5 {
            Decision::Continue {
                output: *n,
                delay: Duration::from_secs(1),
            }
        } else {
            Decision::Done(*n)
        }
    });

    let start = Instant::now();
    let result = poll.repeat(until_five).run(&()).await;

    assert_eq!(result, Ok(5));
    assert_eq!(polls.get(), 5);
    assert!(start.elapsed() >= Duration::from_secs(4));
}

#[tokio::test]
async fn repeat_output_comes_from_schedule() {
    let journal = Journal::new();
    let program = journal
        .record_program::<(), String>("tick")
        .repeat(Schedule::recurs(3).map(|n| format!("{n} recurrences")));

    assert_eq!(program.run(&()).await, Ok("3 recurrences".to_string()));
    assert_eq!(journal.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn either_continues_while_one_side_does() {
    let counter = Counter::new();
    let program: NeverFails<(), u64> = counter.increment_program();

    let schedule = Schedule::recurs(1).either(Schedule::recurs(3));
    let result = program.repeat(schedule).run(&()).await;

    assert_eq!(result, Ok((1, 3)));
    assert_eq!(counter.get(), 4);
}

#[tokio::test]
async fn retried_resource_acquisition_releases_once() {
    let calls = Counter::new();
    let released = Counter::new();

    let on_release = released.clone();
    let connect = acquire_release(
        attempt({
            let calls = calls.clone();
            move || {
                if calls.increment() < 3 {
                    Err("refused".to_string())
                } else {
                    Ok("connection")
                }
            }
        })
        .retry(Schedule::recurs(5)),
        move |_: &&str| on_release.increment_program(),
    );

    let result = scoped(connect).run(&()).await;

    assert_eq!(result, Ok("connection"));
    assert_eq!(calls.get(), 3);
    assert_eq!(released.get(), 1);
}

#[test]
fn runtime_drives_schedule_timers() {
    let runtime = Runtime::new().unwrap();
    let calls = Counter::new();
    let policy = Schedule::linear(Duration::from_millis(5)).both(Schedule::recurs(3));

    let result = runtime.block_on(busy_until(calls.clone(), 2).retry(policy));

    assert_eq!(result.ok(), Some(3));
    runtime.shutdown();
}
