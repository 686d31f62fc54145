// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rill_core::ExecutionModel;
use rill_task::Task;
use rill_test_utils::{dummy, is_dummy, run_ok};

#[test]
fn step_reduces_a_pure_chain_to_its_value() {
    let task = Task::now(1).map(|x| x + 1).flat_map(|x| Task::now(x * 10));

    let simplified = task.step(ExecutionModel::Synchronous);

    // The remainder is already a value; running it does no further work.
    assert_eq!(run_ok(&simplified), 20);
}

#[test]
fn step_runs_delayed_side_effects() {
    let effects = Arc::new(AtomicUsize::new(0));
    let counter = effects.clone();
    let task = Task::eval(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        3
    });

    let _ = task.step(ExecutionModel::Synchronous);

    assert_eq!(effects.load(Ordering::SeqCst), 1);
}

#[test]
fn step_stops_at_async_without_registering() {
    // Arrange - a registration that records if it ever runs
    let registered = Arc::new(AtomicUsize::new(0));
    let witness = registered.clone();
    let task = Task::create(move |_, callback| {
        witness.fetch_add(1, Ordering::SeqCst);
        callback.success(8u32);
    })
    .map(|x| x + 1);

    // Act
    let remainder = task.step(ExecutionModel::Synchronous);

    // Assert - nothing ran, and the remainder still computes the value
    assert_eq!(registered.load(Ordering::SeqCst), 0);
    assert_eq!(run_ok(&remainder), 9);
    assert_eq!(registered.load(Ordering::SeqCst), 1);
}

#[test]
fn step_does_not_start_memoized_producers() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let task = Task::eval(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        4u32
    })
    .memoize();

    let remainder = task.step(ExecutionModel::Synchronous);

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(run_ok(&remainder), 4);
}

#[test]
fn step_applies_error_handlers() {
    let failing: Task<u32> = Task::raise_error(dummy());
    let task = failing.on_error_recover(|_| 6);

    let simplified = task.step(ExecutionModel::Synchronous);

    assert_eq!(run_ok(&simplified), 6);
}

#[test]
fn step_with_exhausted_budget_returns_a_runnable_checkpoint() {
    // Arrange - more reductions than one batch allows
    let mut task = Task::now(0u32);
    for _ in 0..100 {
        task = task.flat_map(|x| Task::now(x + 1));
    }

    // Act - a tiny budget checkpoints partway through
    let checkpoint = task.step(ExecutionModel::batched(4));

    // Assert - resuming the checkpoint finishes the computation
    assert_eq!(run_ok(&checkpoint), 100);
}

#[test]
fn step_surfaces_unhandled_failures() {
    let failing: Task<u32> = Task::raise_error(dummy());
    let simplified = failing.map(|x| x + 1).step(ExecutionModel::Synchronous);
    assert!(is_dummy(&rill_test_utils::run_err(&simplified)));
}
