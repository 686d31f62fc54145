// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error interception with continuation replacement.
//!
//! Every effect-typed tail is wrapped in a guard that, on failure, runs
//! the failing branch's early-stop hooks once and then switches to the
//! handler's replacement stream. Before a tail is guarded, the elements a
//! cursor already has available are extracted into a materialized batch,
//! so values that were safely produced are not lost to a failure that
//! happens while pulling further.

use std::sync::Arc;

use rill_core::non_fatal::guard;
use rill_error::RillError;
use rill_task::Task;

use crate::batch::{Batch, BatchCursor};
use crate::flow::Flow;

type Handler<A> = Arc<dyn Fn(RillError) -> Flow<A> + Send + Sync>;

pub(crate) fn apply<A>(source: Flow<A>, handler: Handler<A>) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    match source {
        source @ (Flow::NextCursor { .. } | Flow::NextBatch { .. }) => {
            let stop = source.stop_task();
            Flow::Suspend {
                rest: Task::eval(move || loop_(source.clone(), handler.clone())),
                stop,
            }
        }
        other => loop_(other, handler),
    }
}

fn loop_<A>(source: Flow<A>, handler: Handler<A>) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    match source {
        Flow::Next { item, rest, stop } => Flow::Next {
            item,
            rest: guard_tail(rest, stop.clone(), handler),
            stop,
        },
        Flow::NextCursor { cursor, rest, stop } => match extract(&cursor) {
            Err(error) => handle_now(stop, error, handler),
            Ok((buffer, has_more)) => {
                let continuation = if has_more {
                    let node = Flow::NextCursor {
                        cursor,
                        rest,
                        stop: stop.clone(),
                    };
                    let h = handler.clone();
                    Task::eval(move || loop_(node.clone(), h.clone()))
                } else {
                    let h = handler.clone();
                    rest.map_unguarded(move |flow| loop_(flow, h.clone()))
                };
                let guarded = recover_on_failure(continuation, stop.clone(), handler);
                if buffer.is_empty() {
                    Flow::Suspend {
                        rest: guarded,
                        stop,
                    }
                } else {
                    Flow::NextBatch {
                        batch: Batch::from_vec(buffer),
                        rest: guarded,
                        stop,
                    }
                }
            }
        },
        Flow::NextBatch { batch, rest, stop } => match guard("batch cursor", || batch.cursor()) {
            Ok(cursor) => loop_(Flow::NextCursor { cursor, rest, stop }, handler),
            Err(error) => handle_now(stop, error, handler),
        },
        Flow::Suspend { rest, stop } => Flow::Suspend {
            rest: guard_tail(rest, stop.clone(), handler),
            stop,
        },
        Flow::Scope {
            acquire,
            use_fn,
            release,
        } => Flow::Scope {
            acquire,
            use_fn: Arc::new(move |resource| loop_(use_fn(resource), handler.clone())),
            release,
        },
        Flow::Last(item) => Flow::Last(item),
        Flow::Halt(None) => Flow::Halt(None),
        Flow::Halt(Some(error)) => handle_now(Task::unit(), error, handler),
        Flow::Stop => Flow::Stop,
    }
}

fn extract<A>(cursor: &BatchCursor<A>) -> Result<(Vec<A>, bool), RillError>
where
    A: Clone + Send + Sync + 'static,
{
    guard("cursor extract", || {
        let budget = cursor.recommended_batch_size();
        let mut buffer = Vec::new();
        while buffer.len() < budget {
            match cursor.next() {
                Some(item) => buffer.push(item),
                None => return (buffer, false),
            }
        }
        let has_more = cursor.has_next();
        (buffer, has_more)
    })
}

fn guard_tail<A>(rest: Task<Flow<A>>, stop: Task<()>, handler: Handler<A>) -> Task<Flow<A>>
where
    A: Clone + Send + Sync + 'static,
{
    let h = handler.clone();
    let mapped = rest.map_unguarded(move |flow| loop_(flow, h.clone()));
    recover_on_failure(mapped, stop, handler)
}

fn recover_on_failure<A>(
    tail: Task<Flow<A>>,
    stop: Task<()>,
    handler: Handler<A>,
) -> Task<Flow<A>>
where
    A: Clone + Send + Sync + 'static,
{
    tail.on_error_handle_with(move |error| recover_task(stop.clone(), error, handler.clone()))
}

/// Run the failing branch's early-stop hooks, then the handler; a handler
/// failure halts with the secondary error.
fn recover_task<A>(stop: Task<()>, error: RillError, handler: Handler<A>) -> Task<Flow<A>>
where
    A: Clone + Send + Sync + 'static,
{
    stop.attempt().flat_map(move |_| {
        let error = error.clone();
        let handler = handler.clone();
        Task::eval(move || match guard("error handler", || handler(error.clone())) {
            Ok(replacement) => replacement,
            Err(secondary) => Flow::Halt(Some(secondary)),
        })
    })
}

fn handle_now<A>(stop: Task<()>, error: RillError, handler: Handler<A>) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    Flow::Suspend {
        rest: recover_task(stop, error, handler),
        stop: Task::unit(),
    }
}
