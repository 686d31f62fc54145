// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Bounded prefix with early-stop signalling.

use std::sync::Arc;

use rill_core::non_fatal::guard;
use rill_task::Task;

use crate::batch::Batch;
use crate::flow::Flow;

pub(crate) fn apply<A>(source: Flow<A>, count: usize) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    if count == 0 {
        // Nothing is pulled: unopened scopes stay unopened, but hooks of
        // the first node still run.
        let stop = source.stop_task();
        return Flow::Suspend {
            rest: stop.attempt().map_unguarded(|_| Flow::Stop),
            stop: Task::unit(),
        };
    }
    match source {
        source @ (Flow::NextCursor { .. } | Flow::NextBatch { .. }) => {
            let stop = source.stop_task();
            Flow::Suspend {
                rest: Task::eval(move || loop_(source.clone(), count)),
                stop,
            }
        }
        other => loop_(other, count),
    }
}

// Invariant: `remaining > 0`.
fn loop_<A>(source: Flow<A>, remaining: usize) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    match source {
        Flow::Next { item, rest, stop } => {
            if remaining == 1 {
                // The budget ends at this element; the tail is abandoned
                // and replaced by the early-stop signal.
                let hooks = stop.clone();
                Flow::Next {
                    item,
                    rest: hooks.attempt().map_unguarded(|_| Flow::Stop),
                    stop,
                }
            } else {
                Flow::Next {
                    item,
                    rest: rest.map_unguarded(move |flow| loop_(flow, remaining - 1)),
                    stop,
                }
            }
        }
        Flow::NextCursor { cursor, rest, stop } => {
            let pulled = guard("cursor take", || {
                let mut buffer = Vec::new();
                while buffer.len() < remaining {
                    match cursor.next() {
                        Some(item) => buffer.push(item),
                        None => break,
                    }
                }
                buffer
            });
            match pulled {
                Err(error) => Flow::Halt(Some(error)),
                Ok(buffer) if buffer.is_empty() => Flow::Suspend {
                    rest: rest.map_unguarded(move |flow| loop_(flow, remaining)),
                    stop,
                },
                Ok(buffer) => {
                    let took = buffer.len();
                    if took == remaining {
                        let hooks = stop.clone();
                        Flow::NextBatch {
                            batch: Batch::from_vec(buffer),
                            rest: hooks.attempt().map_unguarded(|_| Flow::Stop),
                            stop,
                        }
                    } else {
                        Flow::NextBatch {
                            batch: Batch::from_vec(buffer),
                            rest: rest.map_unguarded(move |flow| loop_(flow, remaining - took)),
                            stop,
                        }
                    }
                }
            }
        }
        Flow::NextBatch { batch, rest, stop } => match guard("batch cursor", || batch.cursor()) {
            Ok(cursor) => loop_(Flow::NextCursor { cursor, rest, stop }, remaining),
            Err(error) => Flow::Halt(Some(error)),
        },
        Flow::Suspend { rest, stop } => Flow::Suspend {
            rest: rest.map_unguarded(move |flow| loop_(flow, remaining)),
            stop,
        },
        Flow::Scope {
            acquire,
            use_fn,
            release,
        } => Flow::Scope {
            acquire,
            use_fn: Arc::new(move |resource| loop_(use_fn(resource), remaining)),
            release,
        },
        Flow::Last(item) => Flow::Last(item),
        Flow::Halt(error) => Flow::Halt(error),
        Flow::Stop => Flow::Stop,
    }
}
