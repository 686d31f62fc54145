// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Per-run interpreter state.
//!
//! A [`Context`] travels with one task run from start to completion. It
//! bundles the scheduler, the user options, the frame-index cell and the
//! cancel connection; asynchronous registrations receive it so they can
//! push cancel tokens and read options.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rill_core::{CancelConnection, ExecutionModel, SchedulerRef};

/// User-visible run options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Snapshot context-locals at async submission and reinstate them
    /// around continuations.
    pub propagate_locals: bool,
}

impl Options {
    pub fn with_propagate_locals(mut self, enabled: bool) -> Self {
        self.propagate_locals = enabled;
        self
    }
}

/// State bundle owned by one task run.
#[derive(Clone)]
pub struct Context {
    scheduler: SchedulerRef,
    options: Options,
    frame_ref: Arc<FrameRef>,
    connection: CancelConnection,
}

impl Context {
    pub fn new(scheduler: SchedulerRef, options: Options) -> Self {
        Self::with_connection(scheduler, options, CancelConnection::new())
    }

    pub(crate) fn with_connection(
        scheduler: SchedulerRef,
        options: Options,
        connection: CancelConnection,
    ) -> Self {
        Self {
            scheduler,
            options,
            frame_ref: Arc::new(FrameRef::new()),
            connection,
        }
    }

    pub fn scheduler(&self) -> &SchedulerRef {
        &self.scheduler
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// The cancel-handle stack of this run.
    pub fn connection(&self) -> &CancelConnection {
        &self.connection
    }

    /// Whether the run has been cancelled and must not deliver its result.
    pub fn should_cancel(&self) -> bool {
        self.connection.is_canceled()
    }

    pub fn execution_model(&self) -> ExecutionModel {
        self.scheduler.execution_model()
    }

    pub(crate) fn frame_ref(&self) -> &FrameRef {
        &self.frame_ref
    }
}

/// Thread-bound frame-index cell.
///
/// The async submission path stores the current frame index here so a
/// registration that completes synchronously on the same thread resumes
/// exactly where it left off. A read from any other thread observes `0`:
/// a real thread migration always restarts the frame budget.
pub(crate) struct FrameRef {
    slot: Mutex<(ThreadId, usize)>,
}

impl FrameRef {
    fn new() -> Self {
        Self {
            slot: Mutex::new((thread::current().id(), 0)),
        }
    }

    pub(crate) fn set(&self, index: usize) {
        *self.slot.lock() = (thread::current().id(), index);
    }

    pub(crate) fn get(&self) -> usize {
        let (owner, index) = *self.slot.lock();
        if owner == thread::current().id() {
            index
        } else {
            0
        }
    }

    pub(crate) fn reset(&self) {
        self.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_ref_is_thread_bound() {
        let frame_ref = Arc::new(FrameRef::new());
        frame_ref.set(42);
        assert_eq!(frame_ref.get(), 42);

        let remote = frame_ref.clone();
        let observed = std::thread::spawn(move || remote.get()).join().unwrap();
        assert_eq!(observed, 0);
    }
}
