// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rill_task::Task;
use rill_test_utils::{dummy, is_dummy, run_err, run_ok};

#[test]
fn raise_error_without_handler_fails_the_run() {
    let task: Task<u32> = Task::raise_error(dummy());
    assert!(is_dummy(&run_err(&task)));
}

#[test]
fn handler_replaces_the_failure() {
    // Arrange - bind after the failure must be discarded, handler applies
    let failing: Task<u32> = Task::raise_error(dummy());
    let task = failing
        .flat_map(|_| Task::now(0))
        .on_error_handle_with(|_| Task::now(7));

    // Act & Assert
    assert_eq!(run_ok(&task), 7);
}

#[test]
fn plain_continuations_between_error_and_handler_are_skipped() {
    // Arrange
    let touched = Arc::new(AtomicUsize::new(0));
    let witness = touched.clone();
    let failing: Task<u32> = Task::raise_error(dummy());
    let task = failing
        .map(move |x| {
            witness.fetch_add(1, Ordering::SeqCst);
            x
        })
        .flat_map(|x| Task::now(x + 1))
        .on_error_recover(|_| 42);

    // Act & Assert
    assert_eq!(run_ok(&task), 42);
    assert_eq!(touched.load(Ordering::SeqCst), 0);
}

#[test]
fn successful_values_flow_past_handlers() {
    let task = Task::now(5).on_error_recover(|_| 99).map(|x| x * 2);
    assert_eq!(run_ok(&task), 10);
}

#[test]
fn panicking_thunk_becomes_an_error() {
    let task: Task<u32> = Task::eval(|| panic!("kaboom"));
    let error = run_err(&task);
    assert!(error.to_string().contains("kaboom"), "{error}");
}

#[test]
fn panicking_map_becomes_an_error() {
    let task = Task::now(1).map(|_: u32| -> u32 { panic!("mapped away") });
    let error = run_err(&task);
    assert!(error.to_string().contains("mapped away"), "{error}");
}

#[test]
fn throwing_handler_replaces_the_original_error() {
    let failing: Task<u32> = Task::raise_error(dummy());
    let task = failing.on_error_handle_with(|_| -> Task<u32> { panic!("secondary") });
    let error = run_err(&task);
    assert!(error.to_string().contains("secondary"), "{error}");
}

#[test]
fn attempt_materializes_both_arms() {
    let ok = Task::now(3).attempt();
    assert_eq!(run_ok(&ok), Ok(3));

    let err: Task<u32> = Task::raise_error(dummy());
    let outcome = run_ok(&err.attempt());
    assert!(is_dummy(&outcome.unwrap_err()));
}

#[test]
fn eval_try_routes_err_into_the_error_channel() {
    let task: Task<u32> = Task::eval_try(|| Err(dummy()));
    assert!(is_dummy(&run_err(&task)));
}

#[test]
fn nested_handlers_pick_the_innermost_first() {
    let failing: Task<u32> = Task::raise_error(dummy());
    let task = failing
        .on_error_recover(|_| 1)
        .on_error_recover(|_| 2);
    assert_eq!(run_ok(&task), 1);
}
