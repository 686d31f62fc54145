// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The stream node tree and its operator surface.

use std::fmt;
use std::sync::Arc;

use rill_error::RillError;
use rill_task::Task;

use crate::batch::{Batch, BatchCursor};
use crate::exit_case::ExitCase;
use crate::scope::{expect_resource, ReleaseFn, ScopeResource, UseFn};
use crate::{attempt, consume, do_on_early_stop, drop_while_with_index, map, on_error, take};

/// A lazily unfolding, possibly infinite sequence of `A`s.
///
/// Every tail is a [`Task`], so a `Flow` is itself a pure value: nothing
/// happens until a consumer (`fold_task` and friends) interprets it.
/// Besides their payload and tail, the cons variants carry an *early-stop
/// task* (`stop`): hooks to run when a downstream consumer abandons the
/// stream between this node and its tail.
///
/// Rewriting operators pattern-match every variant and obey three rules:
/// tails stay lazy (`rest` is mapped, never run), [`Scope`](Flow::Scope)
/// nodes are preserved by remapping their `use` continuation so
/// acquire/release stay paired, and non-fatal failures inside a rewriter
/// surface as [`Halt`](Flow::Halt), never as panics.
#[derive(Clone)]
pub enum Flow<A> {
    /// One element, then a lazy tail.
    Next {
        item: A,
        rest: Task<Flow<A>>,
        stop: Task<()>,
    },
    /// A stateful cursor worth of elements, then a lazy tail.
    NextCursor {
        cursor: BatchCursor<A>,
        rest: Task<Flow<A>>,
        stop: Task<()>,
    },
    /// A restartable batch of elements, then a lazy tail.
    NextBatch {
        batch: Batch<A>,
        rest: Task<Flow<A>>,
        stop: Task<()>,
    },
    /// No element yet; the tail decides.
    Suspend {
        rest: Task<Flow<A>>,
        stop: Task<()>,
    },
    /// A bracketed segment: acquire a resource, stream `use_fn`'s result,
    /// release exactly once with the observed [`ExitCase`].
    Scope {
        acquire: Task<ScopeResource>,
        use_fn: UseFn<A>,
        release: ReleaseFn,
    },
    /// Final element.
    Last(A),
    /// Terminal: normal end (`None`) or failure (`Some`).
    Halt(Option<RillError>),
    /// Terminal: a downstream consumer abandoned the stream. Produced only
    /// by early-terminating operators such as [`take`](Flow::take).
    Stop,
}

impl<A: Clone + Send + Sync + 'static> Flow<A> {
    /// Prepend one element.
    pub fn next(item: A, rest: Task<Flow<A>>) -> Self {
        Flow::Next {
            item,
            rest,
            stop: Task::unit(),
        }
    }

    /// Prepend a cursor of elements.
    pub fn next_cursor(cursor: BatchCursor<A>, rest: Task<Flow<A>>) -> Self {
        Flow::NextCursor {
            cursor,
            rest,
            stop: Task::unit(),
        }
    }

    /// Prepend a batch of elements.
    pub fn next_batch(batch: Batch<A>, rest: Task<Flow<A>>) -> Self {
        Flow::NextBatch {
            batch,
            rest,
            stop: Task::unit(),
        }
    }

    /// Defer to an effectful tail.
    pub fn suspend(rest: Task<Flow<A>>) -> Self {
        Flow::Suspend {
            rest,
            stop: Task::unit(),
        }
    }

    /// Defer to a thunk.
    pub fn defer<F>(f: F) -> Self
    where
        F: Fn() -> Flow<A> + Send + Sync + 'static,
    {
        Self::suspend(Task::eval(f))
    }

    /// A one-element stream computed on pull.
    pub fn eval<F>(f: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self::suspend(Task::eval(move || Flow::Last(f())))
    }

    pub fn last(item: A) -> Self {
        Flow::Last(item)
    }

    pub fn empty() -> Self {
        Flow::Halt(None)
    }

    /// A stream that fails immediately.
    pub fn raise(error: RillError) -> Self {
        Flow::Halt(Some(error))
    }

    pub fn of(items: impl IntoIterator<Item = A>) -> Self {
        Self::from_vec(items.into_iter().collect())
    }

    pub fn from_vec(items: Vec<A>) -> Self {
        Flow::NextBatch {
            batch: Batch::from_vec(items),
            rest: Task::now(Flow::empty()),
            stop: Task::unit(),
        }
    }

    /// A bracketed stream segment.
    ///
    /// `acquire` runs through the interpreter when a consumer first reaches
    /// the scope; `release` runs exactly once with the [`ExitCase`] the
    /// consumer observed, on completion, early stop and error alike. When
    /// `acquire` itself fails, `release` never runs.
    pub fn bracket<R, U, REL>(acquire: Task<R>, use_fn: U, release: REL) -> Self
    where
        R: Clone + Send + Sync + 'static,
        U: Fn(&R) -> Flow<A> + Send + Sync + 'static,
        REL: Fn(&R, ExitCase) -> Task<()> + Send + Sync + 'static,
    {
        let acquire = acquire.map(|resource| Arc::new(resource) as ScopeResource);
        let use_fn: UseFn<A> = Arc::new(move |resource| {
            let typed = expect_resource::<R>(resource);
            use_fn(&typed)
        });
        let release: ReleaseFn = Arc::new(move |resource, exit| {
            let typed = expect_resource::<R>(resource);
            release(&typed, exit)
        });
        Flow::Scope {
            acquire,
            use_fn,
            release,
        }
    }

    /// Transform every element.
    pub fn map<B, F>(self, f: F) -> Flow<B>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        map::apply(self, Arc::new(f))
    }

    /// Keep the first `count` elements, abandoning the remainder with an
    /// early-stop signal.
    pub fn take(self, count: usize) -> Flow<A> {
        take::apply(self, count)
    }

    /// Drop the longest prefix on which `predicate(element, index)` holds.
    ///
    /// The index counts every source element, dropped or not.
    pub fn drop_while_with_index<P>(self, predicate: P) -> Flow<A>
    where
        P: Fn(&A, usize) -> bool + Send + Sync + 'static,
    {
        drop_while_with_index::apply(self, Arc::new(predicate))
    }

    /// Drop the longest prefix on which `predicate` holds.
    pub fn drop_while<P>(self, predicate: P) -> Flow<A>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.drop_while_with_index(move |item, _| predicate(item))
    }

    /// On failure, continue with the handler's replacement stream.
    ///
    /// Elements already safely produced before the failure are preserved;
    /// the early-stop hooks of the failing branch run once before the
    /// handler. A handler that itself fails non-fatally halts the stream
    /// with its own error.
    pub fn on_error_handle_with<F>(self, handler: F) -> Flow<A>
    where
        F: Fn(RillError) -> Flow<A> + Send + Sync + 'static,
    {
        on_error::apply(self, Arc::new(handler))
    }

    /// Materialize failures: every element becomes `Ok`, a failure becomes
    /// one trailing `Err` element, and the stream then completes normally.
    pub fn attempt(self) -> Flow<Result<A, RillError>> {
        attempt::apply(self)
    }

    /// Run `hook` when a downstream consumer abandons the stream early.
    pub fn do_on_early_stop(self, hook: Task<()>) -> Flow<A> {
        do_on_early_stop::apply(self, hook)
    }

    /// Consume the whole stream into a fold.
    pub fn fold_task<S, F>(self, seed: S, f: F) -> Task<S>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S, A) -> S + Send + Sync + 'static,
    {
        consume::fold(self, seed, Arc::new(f))
    }

    /// Collect every element.
    pub fn to_vec_task(self) -> Task<Vec<A>> {
        self.fold_task(Vec::new(), |mut acc, item| {
            acc.push(item);
            acc
        })
    }

    /// Drain the stream for its effects.
    pub fn completed_task(self) -> Task<()> {
        self.fold_task((), |_, _| ())
    }

    /// The first element, stopping early once it arrives.
    pub fn head_option_task(self) -> Task<Option<A>> {
        consume::head_option(self)
    }

    /// The early-stop task of this node; `unit` for variants that carry
    /// none.
    pub(crate) fn stop_task(&self) -> Task<()> {
        match self {
            Flow::Next { stop, .. }
            | Flow::NextCursor { stop, .. }
            | Flow::NextBatch { stop, .. }
            | Flow::Suspend { stop, .. } => stop.clone(),
            _ => Task::unit(),
        }
    }
}

/// Halt after running the failing branch's early-stop hooks, swallowing
/// their own failures.
pub(crate) fn signal_error<A: Clone + Send + Sync + 'static>(
    stop: Task<()>,
    error: RillError,
) -> Flow<A> {
    Flow::Suspend {
        rest: stop
            .attempt()
            .map_unguarded(move |_| Flow::Halt(Some(error.clone()))),
        stop: Task::unit(),
    }
}

impl<A> fmt::Debug for Flow<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flow::Next { .. } => "Next",
            Flow::NextCursor { .. } => "NextCursor",
            Flow::NextBatch { .. } => "NextBatch",
            Flow::Suspend { .. } => "Suspend",
            Flow::Scope { .. } => "Scope",
            Flow::Last(_) => "Last",
            Flow::Halt(_) => "Halt",
            Flow::Stop => "Stop",
        };
        f.debug_struct("Flow").field("node", &name).finish()
    }
}
