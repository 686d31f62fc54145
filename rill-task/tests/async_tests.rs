// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::Arc;

use rill_core::{ExecutionModel, SchedulerRef};
use rill_task::Task;
use rill_test_utils::{dummy, CapturedResult, TestScheduler};

#[test]
fn synchronous_completion_continues_in_place() {
    // Arrange - the registration completes before returning
    let scheduler: SchedulerRef = TestScheduler::with_model(ExecutionModel::Synchronous);
    let task = Task::create(|_, callback| callback.success(5)).map(|x: u32| x + 1);
    let captured = CapturedResult::new();

    // Act
    task.run_with_callback(&scheduler, captured.callback());

    // Assert - no scheduler involvement was needed
    assert_eq!(captured.value(), 6);
}

#[test]
fn scheduled_completion_resumes_the_bind_chain() {
    // Arrange - the registration parks the callback on the scheduler
    let scheduler = TestScheduler::with_model(ExecutionModel::Synchronous);
    let scheduler_ref: SchedulerRef = scheduler.clone();
    let task = Task::create(|ctx, callback| {
        let callback = callback.clone();
        ctx.scheduler()
            .execute(Box::new(move || callback.success(40u32)));
    })
    .map(|x| x + 2);
    let captured = CapturedResult::new();

    // Act
    task.run_with_callback(&scheduler_ref, captured.callback());
    assert!(!captured.is_delivered());
    scheduler.run_all();

    // Assert
    assert_eq!(captured.value(), 42);
}

#[test]
fn duplicate_completions_are_reported_not_delivered() {
    // Arrange
    let scheduler = TestScheduler::with_model(ExecutionModel::Synchronous);
    let scheduler_ref: SchedulerRef = scheduler.clone();
    let task = Task::create(|_, callback| {
        callback.success(1u32);
        callback.success(2u32);
    });
    let captured = CapturedResult::new();

    // Act
    task.run_with_callback(&scheduler_ref, captured.callback());

    // Assert - first completion wins, second goes to the reporter
    assert_eq!(captured.value(), 1);
    let failures = scheduler.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("more than once"), "{}", failures[0]);
}

#[test]
fn errors_cross_the_async_boundary() {
    let scheduler = TestScheduler::with_model(ExecutionModel::Synchronous);
    let scheduler_ref: SchedulerRef = scheduler.clone();
    let task: Task<u32> = Task::create(|ctx, callback| {
        let callback = callback.clone();
        ctx.scheduler()
            .execute(Box::new(move || callback.error(dummy())));
    });
    let captured = CapturedResult::new();

    task.run_with_callback(&scheduler_ref, captured.callback());
    scheduler.run_all();

    assert!(rill_test_utils::is_dummy(&captured.error()));
}

#[test]
fn shift_completes_via_the_scheduler() {
    let scheduler = TestScheduler::with_model(ExecutionModel::Synchronous);
    let scheduler_ref: SchedulerRef = scheduler.clone();
    let task = Task::shift().map(|_| "after the boundary");
    let captured = CapturedResult::new();

    task.run_with_callback(&scheduler_ref, captured.callback());

    assert!(!captured.is_delivered());
    assert_eq!(scheduler.run_all(), 1);
    assert_eq!(captured.value(), "after the boundary");
}

#[test]
fn panicking_registration_fails_the_task() {
    let scheduler: SchedulerRef = TestScheduler::with_model(ExecutionModel::Synchronous);
    let task: Task<u32> = Task::create(|_, _| panic!("register blew up"));
    let captured = CapturedResult::new();

    task.run_with_callback(&scheduler, captured.callback());

    assert!(captured.error().to_string().contains("register blew up"));
}

#[tokio::test]
async fn handle_resolves_on_a_real_runtime() -> anyhow::Result<()> {
    // Arrange
    let scheduler: SchedulerRef = Arc::new(rill_core::TokioScheduler::current());
    let task = Task::shift().flat_map(|_| Task::eval(|| 21)).map(|x| x * 2);

    // Act
    let handle = task.run_as_future(&scheduler);
    let value = handle.await;

    // Assert
    assert_eq!(value.unwrap(), 42);
    Ok(())
}
