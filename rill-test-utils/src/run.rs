// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Synchronous task driving for tests.

use std::sync::Arc;

use rill_core::{SchedulerRef, TrampolineScheduler};
use rill_error::RillError;
use rill_task::Task;

/// Run a task to completion on a fresh [`TrampolineScheduler`].
///
/// # Panics
///
/// Panics when the task parks on an external async registration that never
/// completes; everything else finishes synchronously on the trampoline.
pub fn run_sync<T>(task: &Task<T>) -> Result<T, RillError>
where
    T: Clone + Send + Sync + 'static,
{
    let scheduler: SchedulerRef = Arc::new(TrampolineScheduler::default());
    task.run_as_future(&scheduler)
        .try_value()
        .expect("task did not complete synchronously")
}

/// Like [`run_sync`], asserting success.
///
/// # Panics
///
/// Panics when the task fails.
pub fn run_ok<T>(task: &Task<T>) -> T
where
    T: Clone + Send + Sync + 'static,
{
    match run_sync(task) {
        Ok(value) => value,
        Err(error) => panic!("task failed: {error}"),
    }
}

/// Like [`run_sync`], asserting failure.
///
/// # Panics
///
/// Panics when the task succeeds.
pub fn run_err<T>(task: &Task<T>) -> RillError
where
    T: Clone + Send + Sync + 'static,
{
    match run_sync(task) {
        Ok(_) => panic!("task unexpectedly succeeded"),
        Err(error) => error,
    }
}
