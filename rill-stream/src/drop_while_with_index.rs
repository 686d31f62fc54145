// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Index-aware prefix dropping.
//!
//! The element counter threads through every recursive step, batches
//! included. Two budget rules keep cursor scans fair: an exhausted cursor
//! suspends on the node's tail, and a scan that drops a full
//! `recommended_batch_size` worth of elements re-suspends on the *same*
//! node instead of monopolizing the thread.

use std::sync::Arc;

use rill_core::non_fatal::guard;
use rill_task::Task;

use crate::batch::BatchCursor;
use crate::flow::{signal_error, Flow};

type Predicate<A> = Arc<dyn Fn(&A, usize) -> bool + Send + Sync>;

enum Scan<A> {
    /// First element the predicate rejected, and the index after it.
    Found(A, usize),
    /// Cursor drained; index to continue the tail with.
    Exhausted(usize),
    /// Budget spent while still dropping; index to resume the node with.
    Budget(usize),
}

pub(crate) fn apply<A>(source: Flow<A>, predicate: Predicate<A>) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    match source {
        source @ (Flow::NextCursor { .. } | Flow::NextBatch { .. }) => {
            let stop = source.stop_task();
            Flow::Suspend {
                rest: Task::eval(move || loop_(source.clone(), predicate.clone(), 0)),
                stop,
            }
        }
        other => loop_(other, predicate, 0),
    }
}

fn loop_<A>(source: Flow<A>, predicate: Predicate<A>, index: usize) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    match source {
        Flow::Next { item, rest, stop } => {
            match guard("drop predicate", || predicate(&item, index)) {
                Ok(true) => Flow::Suspend {
                    rest: rest
                        .map_unguarded(move |flow| loop_(flow, predicate.clone(), index + 1)),
                    stop,
                },
                Ok(false) => Flow::Next { item, rest, stop },
                Err(error) => signal_error(stop, error),
            }
        }
        Flow::NextCursor { cursor, rest, stop } => {
            scan_cursor(cursor, rest, stop, predicate, index)
        }
        Flow::NextBatch { batch, rest, stop } => match guard("batch cursor", || batch.cursor()) {
            Ok(cursor) => scan_cursor(cursor, rest, stop, predicate, index),
            Err(error) => signal_error(stop, error),
        },
        Flow::Suspend { rest, stop } => Flow::Suspend {
            rest: rest.map_unguarded(move |flow| loop_(flow, predicate.clone(), index)),
            stop,
        },
        Flow::Scope {
            acquire,
            use_fn,
            release,
        } => Flow::Scope {
            acquire,
            use_fn: Arc::new(move |resource| loop_(use_fn(resource), predicate.clone(), index)),
            release,
        },
        Flow::Last(item) => match guard("drop predicate", || predicate(&item, index)) {
            Ok(true) => Flow::Halt(None),
            Ok(false) => Flow::Last(item),
            Err(error) => Flow::Halt(Some(error)),
        },
        Flow::Halt(error) => Flow::Halt(error),
        Flow::Stop => Flow::Stop,
    }
}

fn scan_cursor<A>(
    cursor: BatchCursor<A>,
    rest: Task<Flow<A>>,
    stop: Task<()>,
    predicate: Predicate<A>,
    index: usize,
) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    let scanned = guard("cursor scan", || {
        let budget = cursor.recommended_batch_size();
        let mut index = index;
        let mut dropped = 0usize;
        loop {
            if dropped >= budget {
                return Scan::Budget(index);
            }
            match cursor.next() {
                None => return Scan::Exhausted(index),
                Some(item) => {
                    if predicate(&item, index) {
                        index += 1;
                        dropped += 1;
                    } else {
                        return Scan::Found(item, index);
                    }
                }
            }
        }
    });
    match scanned {
        Err(error) => signal_error(stop, error),
        Ok(Scan::Found(item, _)) => match guard("cursor peek", || cursor.has_next()) {
            // The first kept element; everything after it passes through.
            Ok(true) => Flow::Next {
                item,
                rest: Task::now(Flow::NextCursor {
                    cursor,
                    rest,
                    stop: stop.clone(),
                }),
                stop,
            },
            Ok(false) => Flow::Next { item, rest, stop },
            Err(error) => Flow::Next {
                item,
                rest: Task::now(Flow::Halt(Some(error))),
                stop,
            },
        },
        Ok(Scan::Exhausted(index)) => Flow::Suspend {
            rest: rest.map_unguarded(move |flow| loop_(flow, predicate.clone(), index)),
            stop,
        },
        Ok(Scan::Budget(index)) => {
            // Yield before continuing the same node.
            let node = Flow::NextCursor {
                cursor,
                rest,
                stop: stop.clone(),
            };
            Flow::Suspend {
                rest: Task::eval(move || loop_(node.clone(), predicate.clone(), index)),
                stop,
            }
        }
    }
}
