// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Early-stop hooks.
//!
//! The hook is appended to the `stop` task of every cons node, so it runs
//! whenever a downstream consumer abandons the stream, wherever the cut
//! lands. Hooks registered deeper in the stream run first.

use std::sync::Arc;

use rill_task::Task;

use crate::flow::Flow;

pub(crate) fn apply<A>(source: Flow<A>, hook: Task<()>) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    loop_(source, hook)
}

fn loop_<A>(source: Flow<A>, hook: Task<()>) -> Flow<A>
where
    A: Clone + Send + Sync + 'static,
{
    match source {
        Flow::Next { item, rest, stop } => Flow::Next {
            item,
            rest: tail(rest, hook.clone()),
            stop: chain(stop, hook),
        },
        Flow::NextCursor { cursor, rest, stop } => Flow::NextCursor {
            cursor,
            rest: tail(rest, hook.clone()),
            stop: chain(stop, hook),
        },
        Flow::NextBatch { batch, rest, stop } => Flow::NextBatch {
            batch,
            rest: tail(rest, hook.clone()),
            stop: chain(stop, hook),
        },
        Flow::Suspend { rest, stop } => Flow::Suspend {
            rest: tail(rest, hook.clone()),
            stop: chain(stop, hook),
        },
        Flow::Scope {
            acquire,
            use_fn,
            release,
        } => Flow::Scope {
            acquire,
            use_fn: Arc::new(move |resource| loop_(use_fn(resource), hook.clone())),
            release,
        },
        Flow::Last(item) => Flow::Last(item),
        Flow::Halt(error) => Flow::Halt(error),
        Flow::Stop => Flow::Stop,
    }
}

fn chain(stop: Task<()>, hook: Task<()>) -> Task<()> {
    stop.flat_map(move |_| hook.clone())
}

fn tail<A>(rest: Task<Flow<A>>, hook: Task<()>) -> Task<Flow<A>>
where
    A: Clone + Send + Sync + 'static,
{
    rest.map_unguarded(move |flow| loop_(flow, hook.clone()))
}
