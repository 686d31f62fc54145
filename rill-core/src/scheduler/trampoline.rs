// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Thread-local trampolined execution.
//!
//! `execute_trampolined` runs a closure immediately unless the current
//! thread is already inside a trampolined run; nested submissions are
//! queued and drained by the outermost call. This bounds stack growth when
//! completion hooks re-enter the run loop synchronously (memoization
//! producers resolving chains of waiters, for instance).

use std::cell::RefCell;
use std::collections::VecDeque;

use super::{Runnable, Scheduler};
use crate::exec_model::ExecutionModel;
use crate::logging;
use rill_error::RillError;

thread_local! {
    static QUEUE: RefCell<Option<VecDeque<Runnable>>> = const { RefCell::new(None) };
}

struct ResetOnDrop;

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        QUEUE.with(|slot| {
            *slot.borrow_mut() = None;
        });
    }
}

/// Run `runnable` now, or enqueue it when already trampolining on this
/// thread.
pub fn execute_trampolined(runnable: Runnable) {
    let first = QUEUE.with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_mut() {
            Some(pending) => {
                pending.push_back(runnable);
                None
            }
            None => {
                *slot = Some(VecDeque::new());
                Some(runnable)
            }
        }
    });

    let Some(first) = first else { return };
    // If a job panics, pending work is dropped but the slot is cleared so
    // the thread can trampoline again.
    let _reset = ResetOnDrop;
    let mut next = Some(first);
    while let Some(job) = next {
        job();
        next = QUEUE.with(|slot| slot.borrow_mut().as_mut().and_then(|q| q.pop_front()));
    }
}

/// A scheduler that runs everything on the submitting thread.
///
/// Useful for tests and for the memoization resolver's producer starts; the
/// trampoline keeps recursive submissions from growing the stack.
#[derive(Clone, Debug)]
pub struct TrampolineScheduler {
    model: ExecutionModel,
}

impl TrampolineScheduler {
    pub fn new(model: ExecutionModel) -> Self {
        Self { model }
    }
}

impl Default for TrampolineScheduler {
    fn default() -> Self {
        Self::new(ExecutionModel::Synchronous)
    }
}

impl Scheduler for TrampolineScheduler {
    fn execute(&self, runnable: Runnable) {
        execute_trampolined(runnable);
    }

    fn execution_model(&self) -> ExecutionModel {
        self.model
    }

    fn report_failure(&self, error: &RillError) {
        logging::error!("unhandled failure: {error}");
    }
}
