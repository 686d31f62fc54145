// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Failure materialization.
//!
//! Elements are wrapped in `Ok`; the first failure becomes one trailing
//! `Last(Err(e))` after which the stream is complete. A single-slot cell
//! tracks the most recently observed early-stop task; it runs before the
//! error element is emitted, with its own failure swallowed.

use std::sync::Arc;

use parking_lot::Mutex;
use rill_error::RillError;
use rill_task::Task;

use crate::flow::Flow;

type StopSlot = Arc<Mutex<Task<()>>>;

pub(crate) fn apply<A>(source: Flow<A>) -> Flow<Result<A, RillError>>
where
    A: Clone + Send + Sync + 'static,
{
    let slot: StopSlot = Arc::new(Mutex::new(Task::unit()));
    match source {
        source @ (Flow::NextCursor { .. } | Flow::NextBatch { .. }) => {
            let stop = source.stop_task();
            Flow::Suspend {
                rest: Task::eval(move || loop_(source.clone(), slot.clone())),
                stop,
            }
        }
        other => loop_(other, slot),
    }
}

fn loop_<A>(source: Flow<A>, slot: StopSlot) -> Flow<Result<A, RillError>>
where
    A: Clone + Send + Sync + 'static,
{
    match source {
        Flow::Next { item, rest, stop } => {
            *slot.lock() = stop.clone();
            Flow::Next {
                item: Ok(item),
                rest: guard_tail(rest, slot),
                stop,
            }
        }
        Flow::NextCursor { cursor, rest, stop } => {
            *slot.lock() = stop.clone();
            Flow::NextCursor {
                cursor: cursor.map(Ok),
                rest: guard_tail(rest, slot),
                stop,
            }
        }
        Flow::NextBatch { batch, rest, stop } => {
            *slot.lock() = stop.clone();
            Flow::NextBatch {
                batch: batch.map(Ok),
                rest: guard_tail(rest, slot),
                stop,
            }
        }
        Flow::Suspend { rest, stop } => {
            *slot.lock() = stop.clone();
            Flow::Suspend {
                rest: guard_tail(rest, slot),
                stop,
            }
        }
        Flow::Scope {
            acquire,
            use_fn,
            release,
        } => Flow::Scope {
            acquire,
            use_fn: Arc::new(move |resource| loop_(use_fn(resource), slot.clone())),
            release,
        },
        Flow::Last(item) => Flow::Last(Ok(item)),
        Flow::Halt(None) => Flow::Halt(None),
        Flow::Halt(Some(error)) => Flow::Suspend {
            rest: error_element(slot, error),
            stop: Task::unit(),
        },
        Flow::Stop => Flow::Stop,
    }
}

fn guard_tail<A>(rest: Task<Flow<A>>, slot: StopSlot) -> Task<Flow<Result<A, RillError>>>
where
    A: Clone + Send + Sync + 'static,
{
    let looped = slot.clone();
    rest.map_unguarded(move |flow| loop_(flow, looped.clone()))
        .on_error_handle_with(move |error| error_element(slot.clone(), error))
}

/// The terminal `Last(Err(e))`, preceded by the last observed early-stop
/// task with its own failure swallowed.
fn error_element<A>(slot: StopSlot, error: RillError) -> Task<Flow<Result<A, RillError>>>
where
    A: Clone + Send + Sync + 'static,
{
    Task::defer(move || {
        let stop = slot.lock().clone();
        let error = error.clone();
        stop.attempt()
            .map_unguarded(move |_| Flow::Last(Err(error.clone())))
    })
}
