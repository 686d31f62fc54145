// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Element transformation.

use std::sync::Arc;

use rill_core::non_fatal::guard;
use rill_task::Task;

use crate::flow::{signal_error, Flow};

type MapFn<A, B> = Arc<dyn Fn(A) -> B + Send + Sync>;

pub(crate) fn apply<A, B>(source: Flow<A>, f: MapFn<A, B>) -> Flow<B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    match source {
        // Cursor and batch heads involve live side effects; suspend the
        // first step so the operation as a whole stays a pure value.
        source @ (Flow::NextCursor { .. } | Flow::NextBatch { .. }) => {
            let stop = source.stop_task();
            Flow::Suspend {
                rest: Task::eval(move || loop_(source.clone(), f.clone())),
                stop,
            }
        }
        other => loop_(other, f),
    }
}

fn loop_<A, B>(source: Flow<A>, f: MapFn<A, B>) -> Flow<B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    match source {
        Flow::Next { item, rest, stop } => match guard("map function", || f(item)) {
            Ok(mapped) => Flow::Next {
                item: mapped,
                rest: tail(rest, f),
                stop,
            },
            Err(error) => signal_error(stop, error),
        },
        Flow::NextCursor { cursor, rest, stop } => {
            let g = f.clone();
            Flow::NextCursor {
                cursor: cursor.map(move |item| g(item)),
                rest: tail(rest, f),
                stop,
            }
        }
        Flow::NextBatch { batch, rest, stop } => {
            let g = f.clone();
            Flow::NextBatch {
                batch: batch.map(move |item| g(item)),
                rest: tail(rest, f),
                stop,
            }
        }
        Flow::Suspend { rest, stop } => Flow::Suspend {
            rest: tail(rest, f),
            stop,
        },
        Flow::Scope {
            acquire,
            use_fn,
            release,
        } => Flow::Scope {
            acquire,
            use_fn: Arc::new(move |resource| loop_(use_fn(resource), f.clone())),
            release,
        },
        Flow::Last(item) => match guard("map function", || f(item)) {
            Ok(mapped) => Flow::Last(mapped),
            Err(error) => Flow::Halt(Some(error)),
        },
        Flow::Halt(error) => Flow::Halt(error),
        Flow::Stop => Flow::Stop,
    }
}

fn tail<A, B>(rest: Task<Flow<A>>, f: MapFn<A, B>) -> Task<Flow<B>>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    rest.map_unguarded(move |flow| loop_(flow, f.clone()))
}
