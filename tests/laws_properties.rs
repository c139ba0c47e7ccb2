//! Property-based tests for the algebraic laws of program composition

use proptest::prelude::*;
use slackwater::prelude::*;
use slackwater::testing::run_blocking;

fn double(x: i64) -> Program<(), String, i64> {
    succeed(x.wrapping_mul(2))
}

fn reject_odd(x: i64) -> Program<(), String, i64> {
    if x % 2 == 0 {
        succeed(x / 2)
    } else {
        fail(format!("{x} is odd"))
    }
}

proptest! {
    #[test]
    fn prop_left_identity(value in any::<i64>()) {
        let bound = run_blocking(succeed::<(), String, _>(value).flat_map(reject_odd));
        let direct = run_blocking(reject_odd(value));

        prop_assert_eq!(bound, direct);
    }

    #[test]
    fn prop_right_identity(value in any::<i64>(), fails in any::<bool>()) {
        let program: Program<(), String, i64> = if fails {
            fail(value.to_string())
        } else {
            succeed(value)
        };

        let bound = run_blocking(program.clone().flat_map(|x| succeed(x)));

        prop_assert_eq!(bound, run_blocking(program));
    }

    #[test]
    fn prop_flat_map_associative(value in any::<i64>()) {
        let left = succeed::<(), String, _>(value).flat_map(double).flat_map(reject_odd);
        let right = succeed::<(), String, _>(value).flat_map(|x| double(x).flat_map(reject_odd));

        prop_assert_eq!(run_blocking(left), run_blocking(right));
    }

    #[test]
    fn prop_map_is_flat_map_of_succeed(value in any::<i64>()) {
        let mapped = succeed::<(), String, _>(value).map(|x| x.wrapping_add(1));
        let bound = succeed::<(), String, _>(value).flat_map(|x| succeed(x.wrapping_add(1)));

        prop_assert_eq!(run_blocking(mapped), run_blocking(bound));
    }

    #[test]
    fn prop_failure_short_circuits(message in "[a-z]{1,12}", value in any::<i64>()) {
        let program = fail::<(), String, i64>(message.clone())
            .flat_map(move |_| succeed(value))
            .map(|x| x + 1);

        prop_assert_eq!(run_blocking(program), Err(message));
    }

    #[test]
    fn prop_flip_is_an_involution(value in any::<i64>(), fails in any::<bool>()) {
        let program: Program<(), i64, i64> = if fails { fail(value) } else { succeed(value) };

        let twice = run_blocking(program.clone().flip().flip());

        prop_assert_eq!(twice, run_blocking(program));
    }

    #[test]
    fn prop_map_error_leaves_success_alone(value in any::<i64>()) {
        let program = succeed::<(), String, _>(value).map_error(|e| e.len());

        prop_assert_eq!(run_blocking(program), Ok(value));
    }

    #[test]
    fn prop_catch_all_never_fails(value in any::<i64>(), fails in any::<bool>()) {
        let program: Program<(), i64, i64> = if fails { fail(value) } else { succeed(value) };

        let recovered = run_blocking(program.catch_all(|e| succeed(e)));

        prop_assert_eq!(recovered, Ok(value));
    }

    #[test]
    fn prop_zip_pairs_both_values(a in any::<i64>(), b in any::<bool>()) {
        let program = succeed::<(), String, _>(a).zip(succeed(b));

        prop_assert_eq!(run_blocking(program), Ok((a, b)));
    }

    #[test]
    fn prop_zip_reports_first_failure(first in "[a-z]{1,8}", second in "[A-Z]{1,8}") {
        let program = fail::<(), String, i64>(first.clone()).zip(fail::<(), String, i64>(second));

        prop_assert_eq!(run_blocking(program), Err(first));
    }

    #[test]
    fn prop_provide_matches_access(base in any::<i32>()) {
        let program = access::<i32, String, _, _>(|n| i64::from(*n) * 3);

        prop_assert_eq!(run_blocking(program.provide(base)), Ok(i64::from(base) * 3));
    }

    #[test]
    fn prop_repeated_runs_agree(value in any::<i64>()) {
        let program = succeed::<(), String, _>(value).flat_map(reject_odd);

        prop_assert_eq!(run_blocking(program.clone()), run_blocking(program));
    }
}
