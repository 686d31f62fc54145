// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Deterministic scheduler for single-stepping tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rill_core::{ExecutionModel, Runnable, Scheduler};
use rill_error::RillError;

/// A scheduler whose queue only advances when the test says so.
///
/// Submitted runnables accumulate in FIFO order; [`tick`](Self::tick) runs
/// one, [`run_all`](Self::run_all) drains until quiescent. Failures handed
/// to [`report_failure`](Scheduler::report_failure) are recorded for
/// assertion instead of being printed.
pub struct TestScheduler {
    queue: Mutex<VecDeque<Runnable>>,
    failures: Mutex<Vec<String>>,
    model: ExecutionModel,
}

impl TestScheduler {
    pub fn new() -> Arc<Self> {
        Self::with_model(ExecutionModel::default())
    }

    pub fn with_model(model: ExecutionModel) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            failures: Mutex::new(Vec::new()),
            model,
        })
    }

    /// Run the oldest queued runnable. Returns `false` when idle.
    pub fn tick(&self) -> bool {
        let job = self.queue.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run until the queue stays empty; returns how many runnables ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.tick() {
            ran += 1;
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Messages of every failure reported so far.
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }
}

impl Scheduler for TestScheduler {
    fn execute(&self, runnable: Runnable) {
        self.queue.lock().push_back(runnable);
    }

    fn execution_model(&self) -> ExecutionModel {
        self.model
    }

    fn report_failure(&self, error: &RillError) {
        self.failures.lock().push(error.to_string());
    }
}
