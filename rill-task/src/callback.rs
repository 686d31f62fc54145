// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Completion callbacks for asynchronous boundaries.
//!
//! When the run loop reaches an `Async` node it packages everything needed
//! to continue (context, user callback, the saved bind chain, optionally a
//! locals snapshot) into a [`RestartCallback`]. Whoever completes the
//! registration re-enters the trampoline through it. The public face of
//! that machinery is [`TaskCallback`], the typed handle a registration
//! receives.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use rill_core::{BindStack, LocalContext};
use rill_error::RillError;

use crate::context::Context;
use crate::erased::{boxed, Boxed};
use crate::frame::Frame;
use crate::node::Node;
use crate::run_loop;

pub(crate) type RawCallback = Box<dyn FnOnce(Result<Boxed, RillError>) + Send>;

pub(crate) struct RestartState {
    pub context: Context,
    pub callback: RawCallback,
    pub b_first: Option<Frame>,
    pub b_rest: Option<BindStack<Frame>>,
    pub locals: Option<LocalContext>,
}

/// Single-shot re-entry point into the trampoline.
///
/// Accepts at most one completion; later completions are reported to the
/// scheduler's failure reporter instead of being delivered.
pub(crate) struct RestartCallback {
    scheduler: rill_core::SchedulerRef,
    state: Mutex<Option<RestartState>>,
}

impl RestartCallback {
    pub(crate) fn new(state: RestartState) -> Arc<Self> {
        Arc::new(Self {
            scheduler: state.context.scheduler().clone(),
            state: Mutex::new(Some(state)),
        })
    }

    /// Resume the saved run with `outcome`.
    ///
    /// Cancellation is checked here, after the asynchronous work finished
    /// and before anything is signalled: a cancelled run neither resumes
    /// nor delivers.
    pub(crate) fn signal(&self, outcome: Result<Boxed, RillError>) {
        let Some(state) = self.state.lock().take() else {
            self.scheduler.report_failure(&RillError::DuplicateCallback {
                context: "asynchronous task callback".into(),
            });
            return;
        };
        let RestartState {
            context,
            callback,
            b_first,
            b_rest,
            locals,
        } = state;
        if context.should_cancel() {
            return;
        }
        let current = match outcome {
            Ok(value) => Node::Pure(value),
            Err(error) => Node::Fail(error),
        };
        let run = move || {
            // Resume where the submission left off if no thread jump
            // happened; a migrated read yields 0 and restarts the budget.
            let saved = context.frame_ref().get();
            let frame = if saved == 0 {
                context.execution_model().next_frame_index(0)
            } else {
                saved
            };
            run_loop::execute(current, context, callback, b_first, b_rest, frame);
        };
        match locals {
            Some(snapshot) => LocalContext::with_context(&snapshot, run),
            None => run(),
        }
    }
}

/// Typed completion handle handed to `Task::create` registrations.
///
/// Clones share the same single-shot slot: only the first `success`,
/// `error` or `complete` across all clones is delivered.
pub struct TaskCallback<A> {
    restart: Arc<RestartCallback>,
    _marker: PhantomData<fn(A)>,
}

impl<A> Clone for TaskCallback<A> {
    fn clone(&self) -> Self {
        Self {
            restart: self.restart.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A: Clone + Send + Sync + 'static> TaskCallback<A> {
    pub(crate) fn new(restart: Arc<RestartCallback>) -> Self {
        Self {
            restart,
            _marker: PhantomData,
        }
    }

    pub fn success(&self, value: A) {
        self.restart.signal(Ok(boxed(value)));
    }

    pub fn error(&self, error: RillError) {
        self.restart.signal(Err(error));
    }

    pub fn complete(&self, outcome: Result<A, RillError>) {
        self.restart.signal(outcome.map(boxed));
    }
}
