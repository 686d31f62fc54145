// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Randomized properties of the interpreter: monad laws (observationally),
//! at-most-once delivery and stack safety over generated trees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rill_core::{ExecutionModel, SchedulerRef};
use rill_task::Task;
use rill_test_utils::{dummy, run_sync, CapturedResult, TestScheduler};

/// A small generated task: value-producing with assorted node shapes.
fn gen_task(rng: &mut fastrand::Rng, value: i64) -> Task<i64> {
    match rng.u8(0..5) {
        0 => Task::now(value),
        1 => Task::eval(move || value),
        2 => Task::defer(move || Task::now(value)),
        3 => Task::now(value).map(|x| x),
        _ => Task::now(0).flat_map(move |zero| Task::now(zero + value)),
    }
}

fn observe(task: &Task<i64>) -> Result<i64, String> {
    run_sync(task).map_err(|e| e.to_string())
}

#[test]
fn monad_left_identity() {
    let mut rng = fastrand::Rng::with_seed(0xA11CE);
    for _ in 0..200 {
        let a = rng.i64(-1000..1000);
        let f = |x: i64| Task::now(x.wrapping_mul(3).wrapping_sub(7));

        let lhs = Task::now(a).flat_map(f);
        let rhs = f(a);

        assert_eq!(observe(&lhs), observe(&rhs));
    }
}

#[test]
fn monad_right_identity() {
    let mut rng = fastrand::Rng::with_seed(0xB0B);
    for _ in 0..200 {
        let seed = rng.i64(-1000..1000);
        let m = gen_task(&mut rng, seed);

        let lhs = m.clone().flat_map(Task::now);

        assert_eq!(observe(&lhs), observe(&m));
    }
}

#[test]
fn monad_associativity() {
    let mut rng = fastrand::Rng::with_seed(0xC0FFEE);
    for _ in 0..200 {
        let seed = rng.i64(-1000..1000);
        let m = gen_task(&mut rng, seed);
        let f = |x: i64| Task::now(x.wrapping_add(1));
        let g = |x: i64| Task::eval(move || x.wrapping_mul(2));

        let lhs = m.clone().flat_map(f).flat_map(g);
        let rhs = m.flat_map(move |x| f(x).flat_map(g));

        assert_eq!(observe(&lhs), observe(&rhs));
    }
}

#[test]
fn callback_fires_exactly_once_over_random_trees() {
    let mut rng = fastrand::Rng::with_seed(0xDEAD);
    for round in 0..100 {
        // Arrange - a random chain seasoned with failures and recoveries
        let mut task = gen_task(&mut rng, round);
        for _ in 0..rng.usize(0..20) {
            task = match rng.u8(0..4) {
                0 => task.map(|x| x + 1),
                1 => task.flat_map(|x| Task::now(x)),
                2 => task.flat_map(|_| Task::raise_error(dummy())),
                _ => task.on_error_recover(|_| -1),
            };
        }

        // Act - CapturedResult asserts the single delivery internally
        let deliveries = Arc::new(AtomicUsize::new(0));
        let counter = deliveries.clone();
        let scheduler: SchedulerRef = TestScheduler::with_model(ExecutionModel::Synchronous);
        task.run_with_callback(&scheduler, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Assert
        assert_eq!(deliveries.load(Ordering::SeqCst), 1, "round {round}");
    }
}

#[test]
fn random_deep_chains_stay_stack_safe() {
    let mut rng = fastrand::Rng::with_seed(0xFEED);
    for _ in 0..5 {
        let depth = rng.usize(50_000..100_000);
        let mut task = Task::now(0i64);
        for _ in 0..depth {
            task = match rng.u8(0..2) {
                0 => task.map(|x| x + 1),
                _ => task.flat_map(|x| Task::now(x + 1)),
            };
        }
        assert_eq!(observe(&task), Ok(depth as i64));
    }
}

#[test]
fn recursive_defer_unfolds_lazily_in_constant_stack() {
    // The idiomatic way to loop: each defer materializes only when the
    // interpreter reaches it, so no deep structure ever exists at once.
    fn countdown(n: u64, acc: i64) -> Task<i64> {
        if n == 0 {
            Task::now(acc)
        } else {
            Task::defer(move || countdown(n - 1, acc + 1))
        }
    }
    assert_eq!(observe(&countdown(200_000, 0)), Ok(200_000));
}

#[test]
fn frame_budget_bounds_synchronous_bursts() {
    // With an always-async model every reduction yields; the whole chain
    // drains through the scheduler queue without recursion.
    let scheduler = TestScheduler::with_model(ExecutionModel::AlwaysAsync);
    let scheduler_ref: SchedulerRef = scheduler.clone();
    let mut task = Task::now(0u32);
    for _ in 0..50 {
        task = task.flat_map(|x| Task::now(x + 1));
    }
    let captured = CapturedResult::new();

    task.run_with_callback(&scheduler_ref, captured.callback());
    let hops = scheduler.run_all();

    assert_eq!(captured.value(), 50);
    assert!(hops >= 50, "expected one hop per reduction, got {hops}");
}
