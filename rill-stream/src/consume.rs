// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Stream consumers.
//!
//! A consumer walks the node tree keeping a LIFO stack of open scopes.
//! Reaching a terminal releases the whole stack, newest scope first, with
//! the exit case the terminal dictates: `Completed` for a natural end,
//! `Error(e)` for a failure, `EarlyStop` for `Stop` or a consumer-side
//! abort. Recursion happens through `Task::flat_map`, so consumption of a
//! stream of any length runs in constant stack on the trampoline, and
//! cursor draining re-suspends once per `recommended_batch_size` to keep
//! long batches from monopolizing a thread.

use std::sync::Arc;

use rill_core::non_fatal::guard;
use rill_error::RillError;
use rill_task::Task;

use crate::exit_case::ExitCase;
use crate::flow::Flow;
use crate::scope::ReleaseOnce;

type FoldFn<S, A> = Arc<dyn Fn(S, A) -> S + Send + Sync>;

pub(crate) fn fold<A, S>(source: Flow<A>, seed: S, f: FoldFn<S, A>) -> Task<S>
where
    A: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    Task::defer(move || step(source.clone(), seed.clone(), f.clone(), Vec::new()))
}

fn step<A, S>(flow: Flow<A>, acc: S, f: FoldFn<S, A>, scopes: Vec<ReleaseOnce>) -> Task<S>
where
    A: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    match flow {
        Flow::Next { item, rest, stop } => match guard("fold function", || f(acc, item)) {
            Ok(acc) => pull(rest, acc, f, scopes),
            Err(error) => consumer_failure(stop, scopes, error),
        },
        Flow::NextCursor { cursor, rest, stop } => {
            let budget = cursor.recommended_batch_size();
            let outcome = guard("cursor fold", || {
                let mut acc = acc;
                let mut taken = 0usize;
                loop {
                    if taken >= budget {
                        return (acc, false);
                    }
                    match cursor.next() {
                        None => return (acc, true),
                        Some(item) => {
                            acc = f(acc, item);
                            taken += 1;
                        }
                    }
                }
            });
            match outcome {
                Err(error) => stream_error(scopes, error),
                Ok((acc, true)) => pull(rest, acc, f, scopes),
                Ok((acc, false)) => {
                    // Budget spent: yield, then continue the same node.
                    let node = Flow::NextCursor { cursor, rest, stop };
                    Task::defer(move || {
                        step(node.clone(), acc.clone(), f.clone(), scopes.clone())
                    })
                }
            }
        }
        Flow::NextBatch { batch, rest, stop } => match guard("batch cursor", || batch.cursor()) {
            Ok(cursor) => step(Flow::NextCursor { cursor, rest, stop }, acc, f, scopes),
            Err(error) => stream_error(scopes, error),
        },
        Flow::Suspend { rest, .. } => pull(rest, acc, f, scopes),
        Flow::Scope {
            acquire,
            use_fn,
            release,
        } => acquire.attempt().flat_map(move |acquired| match acquired {
            Err(error) => stream_error(scopes.clone(), error),
            Ok(resource) => {
                let once = ReleaseOnce::new(release.clone(), resource.clone());
                match guard("scope use", || use_fn(resource.clone())) {
                    Ok(inner) => {
                        let mut scopes = scopes.clone();
                        scopes.push(once);
                        step(inner, acc.clone(), f.clone(), scopes)
                    }
                    Err(error) => once
                        .run_quiet(ExitCase::Error(error.clone()))
                        .flat_map({
                            let scopes = scopes.clone();
                            move |_| stream_error(scopes.clone(), error.clone())
                        }),
                }
            }
        }),
        Flow::Last(item) => match guard("fold function", || f(acc, item)) {
            Ok(acc) => finish(scopes, ExitCase::Completed, acc),
            Err(error) => consumer_failure(Task::unit(), scopes, error),
        },
        Flow::Halt(None) => finish(scopes, ExitCase::Completed, acc),
        Flow::Halt(Some(error)) => stream_error(scopes, error),
        Flow::Stop => finish(scopes, ExitCase::EarlyStop, acc),
    }
}

fn pull<A, S>(rest: Task<Flow<A>>, acc: S, f: FoldFn<S, A>, scopes: Vec<ReleaseOnce>) -> Task<S>
where
    A: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    rest.attempt().flat_map(move |outcome| match outcome {
        Ok(next) => step(next, acc.clone(), f.clone(), scopes.clone()),
        Err(error) => stream_error(scopes.clone(), error),
    })
}

pub(crate) fn head_option<A>(source: Flow<A>) -> Task<Option<A>>
where
    A: Clone + Send + Sync + 'static,
{
    Task::defer(move || head_step(source.clone(), Vec::new()))
}

fn head_step<A>(flow: Flow<A>, scopes: Vec<ReleaseOnce>) -> Task<Option<A>>
where
    A: Clone + Send + Sync + 'static,
{
    match flow {
        Flow::Next { item, stop, .. } => abandon(stop, scopes, Some(item)),
        Flow::NextCursor { cursor, rest, stop } => {
            match guard("cursor head", || cursor.next()) {
                Ok(Some(item)) => abandon(stop, scopes, Some(item)),
                Ok(None) => pull_head(rest, scopes),
                Err(error) => stream_error(scopes, error),
            }
        }
        Flow::NextBatch { batch, rest, stop } => match guard("batch cursor", || batch.cursor()) {
            Ok(cursor) => head_step(Flow::NextCursor { cursor, rest, stop }, scopes),
            Err(error) => stream_error(scopes, error),
        },
        Flow::Suspend { rest, .. } => pull_head(rest, scopes),
        Flow::Scope {
            acquire,
            use_fn,
            release,
        } => acquire.attempt().flat_map(move |acquired| match acquired {
            Err(error) => stream_error(scopes.clone(), error),
            Ok(resource) => {
                let once = ReleaseOnce::new(release.clone(), resource.clone());
                match guard("scope use", || use_fn(resource.clone())) {
                    Ok(inner) => {
                        let mut scopes = scopes.clone();
                        scopes.push(once);
                        head_step(inner, scopes)
                    }
                    Err(error) => once
                        .run_quiet(ExitCase::Error(error.clone()))
                        .flat_map({
                            let scopes = scopes.clone();
                            move |_| stream_error(scopes.clone(), error.clone())
                        }),
                }
            }
        }),
        Flow::Last(item) => finish(scopes, ExitCase::Completed, Some(item)),
        Flow::Halt(None) => finish(scopes, ExitCase::Completed, None),
        Flow::Halt(Some(error)) => stream_error(scopes, error),
        Flow::Stop => finish(scopes, ExitCase::EarlyStop, None),
    }
}

fn pull_head<A>(rest: Task<Flow<A>>, scopes: Vec<ReleaseOnce>) -> Task<Option<A>>
where
    A: Clone + Send + Sync + 'static,
{
    rest.attempt().flat_map(move |outcome| match outcome {
        Ok(next) => head_step(next, scopes.clone()),
        Err(error) => stream_error(scopes.clone(), error),
    })
}

/// Consumer-side early stop: run the node's hooks, release every open
/// scope, then yield `value`.
fn abandon<V>(stop: Task<()>, scopes: Vec<ReleaseOnce>, value: V) -> Task<V>
where
    V: Clone + Send + Sync + 'static,
{
    stop.attempt()
        .flat_map(move |_| release_all(scopes.clone(), ExitCase::EarlyStop))
        .map_unguarded(move |_| value.clone())
}

/// Terminal: release every open scope with `exit`, then yield `value`.
fn finish<V>(scopes: Vec<ReleaseOnce>, exit: ExitCase, value: V) -> Task<V>
where
    V: Clone + Send + Sync + 'static,
{
    release_all(scopes, exit).map_unguarded(move |_| value.clone())
}

/// A failure surfaced from the stream: release with `Error`, re-raise.
fn stream_error<V>(scopes: Vec<ReleaseOnce>, error: RillError) -> Task<V>
where
    V: Clone + Send + Sync + 'static,
{
    release_all(scopes, ExitCase::Error(error.clone()))
        .flat_map(move |_| Task::raise_error(error.clone()))
}

/// The consumer's own function failed: hooks, early-stop releases, then
/// the failure.
fn consumer_failure<V>(stop: Task<()>, scopes: Vec<ReleaseOnce>, error: RillError) -> Task<V>
where
    V: Clone + Send + Sync + 'static,
{
    stop.attempt()
        .flat_map(move |_| release_all_quiet(scopes.clone(), ExitCase::EarlyStop))
        .flat_map(move |_| Task::raise_error(error.clone()))
}

/// Release open scopes newest-first.
///
/// While the exit case is an error, release failures are reported and the
/// walk continues with the same case. On the normal path a release failure
/// switches the remaining (outer) scopes to `Error` and then propagates:
/// the first error wins, later ones go to the reporter.
fn release_all(scopes: Vec<ReleaseOnce>, exit: ExitCase) -> Task<()> {
    let mut scopes = scopes;
    match scopes.pop() {
        None => Task::unit(),
        Some(once) => match exit {
            ExitCase::Error(original) => once
                .run_quiet(ExitCase::Error(original.clone()))
                .flat_map(move |_| release_all(scopes.clone(), ExitCase::Error(original.clone()))),
            other => once.run(other.clone()).attempt().flat_map(move |outcome| {
                match outcome {
                    Ok(_) => release_all(scopes.clone(), other.clone()),
                    Err(error) => release_all(scopes.clone(), ExitCase::Error(error.clone()))
                        .flat_map(move |_| Task::raise_error(error.clone())),
                }
            }),
        },
    }
}

/// Like [`release_all`], but failures never propagate: they are reported
/// to the scheduler, because another outcome is already on its way out.
fn release_all_quiet(scopes: Vec<ReleaseOnce>, exit: ExitCase) -> Task<()> {
    let mut scopes = scopes;
    match scopes.pop() {
        None => Task::unit(),
        Some(once) => once
            .run_quiet(exit.clone())
            .flat_map(move |_| release_all_quiet(scopes.clone(), exit.clone())),
    }
}
