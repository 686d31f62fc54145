// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The memoization resolver.
//!
//! A memoized node shares one producer run between every task that visits
//! it. The cell is a padded CAS slot over three states: empty, in progress
//! (promise plus the producer's cancel connection), done. Visitors race on
//! the empty→in-progress transition; the single winner starts the producer,
//! and everyone, winner included, parks on the promise.
//!
//! With `cache_errors = false` a failing producer resets the cell to empty
//! *before* completing the promise, so in-flight waiters receive the
//! current failure while the next run starts the producer afresh.

use std::sync::Arc;

use rill_core::scheduler::execute_trampolined;
use rill_core::{CancelConnection, OneShot, PaddedCell};
use rill_error::RillError;

use crate::callback::RawCallback;
use crate::context::Context;
use crate::erased::Boxed;
use crate::node::Node;
use crate::run_loop;

pub(crate) type Outcome = Result<Boxed, RillError>;

pub(crate) struct MemoCell {
    state: PaddedCell<MemoState>,
    producer: Node,
    cache_errors: bool,
}

enum MemoState {
    Empty,
    InProgress(Arc<OneShot<Outcome>>, CancelConnection),
    Done(Outcome),
}

impl MemoCell {
    pub(crate) fn new(producer: Node, cache_errors: bool) -> Self {
        Self {
            state: PaddedCell::new(MemoState::Empty),
            producer,
            cache_errors,
        }
    }

    pub(crate) fn caches_errors(&self) -> bool {
        self.cache_errors
    }
}

pub(crate) enum Visit {
    /// Hot path: the cell is done, the outcome is immediately available.
    Ready(Outcome),
    /// The producer is (now) in flight; park on the promise.
    Waiting(Arc<OneShot<Outcome>>),
}

pub(crate) fn visit(cell: &Arc<MemoCell>, context: &Context) -> Visit {
    loop {
        let state = cell.state.load();
        match &*state {
            MemoState::Done(outcome) => return Visit::Ready(outcome.clone()),
            MemoState::InProgress(promise, connection) => {
                // Cancelling this waiter propagates to the shared producer.
                context.connection().push(Arc::new(connection.clone()));
                return Visit::Waiting(promise.clone());
            }
            MemoState::Empty => {
                let promise = Arc::new(OneShot::new());
                let connection = CancelConnection::new();
                let in_progress = Arc::new(MemoState::InProgress(
                    promise.clone(),
                    connection.clone(),
                ));
                if !cell.state.compare_exchange(&state, in_progress.clone()) {
                    // Lost the installation race; re-read the winner's state.
                    continue;
                }
                context.connection().push(Arc::new(connection.clone()));
                start_producer(cell.clone(), context, promise.clone(), connection, in_progress);
                return Visit::Waiting(promise);
            }
        }
    }
}

/// Non-effectful read used by `step`: never starts the producer.
pub(crate) fn peek(cell: &MemoCell) -> Option<Outcome> {
    match &*cell.state.load() {
        MemoState::Done(outcome) => Some(outcome.clone()),
        _ => None,
    }
}

fn start_producer(
    cell: Arc<MemoCell>,
    context: &Context,
    promise: Arc<OneShot<Outcome>>,
    connection: CancelConnection,
    in_progress: Arc<MemoState>,
) {
    let producer = cell.producer.clone();
    let child = Context::with_connection(context.scheduler().clone(), context.options(), connection);
    let complete: RawCallback = Box::new(move |outcome: Outcome| {
        let next = if outcome.is_err() && !cell.cache_errors {
            Arc::new(MemoState::Empty)
        } else {
            Arc::new(MemoState::Done(outcome.clone()))
        };
        // Record (or reset) before completing the promise so a waiter that
        // immediately re-runs observes the final cell state.
        let _ = cell.state.compare_exchange(&in_progress, next);
        promise.try_complete(outcome);
    });
    execute_trampolined(Box::new(move || run_loop::start(producer, child, complete)));
}
