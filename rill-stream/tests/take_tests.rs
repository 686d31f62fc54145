// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rill_stream::Flow;
use rill_task::Task;
use rill_test_utils::{run_ok, Recorder};

#[test]
fn take_keeps_the_prefix() {
    let flow = Flow::of([1, 2, 3, 4, 5]).take(3);
    assert_eq!(run_ok(&flow.to_vec_task()), vec![1, 2, 3]);
}

#[test]
fn take_more_than_available_is_the_whole_stream() {
    let flow = Flow::of([1, 2]).take(10);
    assert_eq!(run_ok(&flow.to_vec_task()), vec![1, 2]);
}

#[test]
fn take_zero_is_empty_and_pulls_nothing() {
    // Arrange - a source whose tail would record if pulled
    let pulled = Arc::new(AtomicUsize::new(0));
    let witness = pulled.clone();
    let flow = Flow::next(
        1,
        Task::eval(move || {
            witness.fetch_add(1, Ordering::SeqCst);
            Flow::last(2)
        }),
    )
    .take(0);

    // Act & Assert
    assert_eq!(run_ok(&flow.to_vec_task()), Vec::<i32>::new());
    assert_eq!(pulled.load(Ordering::SeqCst), 0);
}

#[test]
fn take_abandons_the_tail_without_pulling_it() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let witness = pulled.clone();
    let flow = Flow::next(
        1,
        Task::eval(move || {
            witness.fetch_add(1, Ordering::SeqCst);
            Flow::last(2)
        }),
    )
    .take(1);

    assert_eq!(run_ok(&flow.to_vec_task()), vec![1]);
    assert_eq!(pulled.load(Ordering::SeqCst), 0);
}

#[test]
fn take_runs_early_stop_hooks_at_the_cut() {
    // Arrange
    let hooks = Recorder::new();
    let seen = hooks.clone();
    let flow = Flow::of([1, 2, 3, 4])
        .do_on_early_stop(Task::eval(move || seen.push("stopped")))
        .take(2);

    // Act
    assert_eq!(run_ok(&flow.to_vec_task()), vec![1, 2]);

    // Assert - the hook ran exactly once
    assert_eq!(hooks.items(), vec!["stopped"]);
}

#[test]
fn full_consumption_does_not_run_early_stop_hooks() {
    let hooks: Recorder<&str> = Recorder::new();
    let seen = hooks.clone();
    let flow = Flow::of([1, 2]).do_on_early_stop(Task::eval(move || seen.push("stopped")));

    assert_eq!(run_ok(&flow.to_vec_task()), vec![1, 2]);
    assert!(hooks.is_empty());
}

#[test]
fn take_composes_with_itself() {
    let flow = Flow::of([1, 2, 3, 4, 5]).take(4).take(2);
    assert_eq!(run_ok(&flow.to_vec_task()), vec![1, 2]);
}
