// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The trampoline.
//!
//! One loop interprets every task tree. Its locals are the whole story:
//! `current` (the node under reduction), `b_first` (inline scratch slot for
//! the most recent continuation), `b_rest` (overflow bind stack) and
//! `frame_index` (the frame budget). Nested `Bind`/`Mapped` sources are
//! re-associated left-deep simply by pushing their frames and descending
//! into the source, so recursion depth never follows tree depth.
//!
//! Leaving the loop happens in exactly four ways: delivering a result,
//! yielding at frame index 0, handing off to an `Async` registration, or
//! parking on a memoization promise. The last three capture the live bind
//! chain and re-enter `execute` later.

use rill_core::non_fatal::{guard, guard_try};
use rill_core::scheduler::execute_trampolined;
use rill_core::{BindStack, ExecutionModel, LocalContext, OneShot, Runnable};

use crate::callback::{RawCallback, RestartCallback, RestartState};
use crate::context::Context;
use crate::frame::{Frame, RecoverFn};
use crate::memo::{self, Outcome, Visit};
use crate::node::{Node, RegisterFn, Tail};
use std::sync::Arc;

/// Interpret `node` from a fresh frame budget.
pub(crate) fn start(node: Node, context: Context, callback: RawCallback) {
    let frame = context.execution_model().next_frame_index(0);
    execute(node, context, callback, None, None, frame);
}

/// The run loop proper. Also the re-entry point for restarts, which carry
/// their saved bind chain back in through `b_first`/`b_rest`.
pub(crate) fn execute(
    mut current: Node,
    context: Context,
    callback: RawCallback,
    mut b_first: Option<Frame>,
    mut b_rest: Option<BindStack<Frame>>,
    mut frame_index: usize,
) {
    let model = context.execution_model();
    'outer: loop {
        if frame_index == 0 {
            force_boundary(current, context, callback, b_first, b_rest);
            return;
        }

        let value = 'eval: {
            match current {
                Node::Bind { source, frame } => {
                    if let Some(previous) = b_first.take() {
                        b_rest.get_or_insert_with(BindStack::new).push(previous);
                    }
                    b_first = Some(frame);
                    current = source.into_node();
                    continue 'outer;
                }
                Node::Mapped { source, f, guarded } => {
                    if let Some(previous) = b_first.take() {
                        b_rest.get_or_insert_with(BindStack::new).push(previous);
                    }
                    b_first = Some(Frame::Map(f, guarded));
                    current = source.into_node();
                    continue 'outer;
                }
                Node::Pure(value) => break 'eval value,
                Node::Delay(thunk) => match guard_try("delayed thunk", || thunk()) {
                    Ok(value) => break 'eval value,
                    Err(error) => {
                        current = Node::Fail(error);
                        continue 'outer;
                    }
                },
                Node::Suspend(thunk) => {
                    current = match guard("suspended thunk", || thunk()) {
                        Ok(next) => next,
                        Err(error) => Node::Fail(error),
                    };
                    continue 'outer;
                }
                Node::Fail(error) => match take_recover(&mut b_first, &mut b_rest) {
                    None => {
                        callback(Err(error));
                        return;
                    }
                    Some(handler) => {
                        current = match guard("error handler", || handler(error)) {
                            Ok(next) => next,
                            Err(follow_up) => Node::Fail(follow_up),
                        };
                        frame_index = model.next_frame_index(frame_index);
                        continue 'outer;
                    }
                },
                Node::Async { register } => {
                    submit_async(register, context, callback, b_first, b_rest, frame_index);
                    return;
                }
                Node::Memoized(cell) => match memo::visit(&cell, &context) {
                    Visit::Ready(Ok(value)) => break 'eval value,
                    Visit::Ready(Err(error)) => {
                        current = Node::Fail(error);
                        continue 'outer;
                    }
                    Visit::Waiting(promise) => {
                        wait_on_promise(promise, context, callback, b_first, b_rest);
                        return;
                    }
                },
            }
        };

        match pop_continuation(&mut b_first, &mut b_rest) {
            None => {
                callback(Ok(value));
                return;
            }
            Some(Frame::Bind(bind)) => {
                current = match guard("bind continuation", || bind(value)) {
                    Ok(next) => next,
                    Err(error) => Node::Fail(error),
                };
            }
            Some(Frame::Map(map, true)) => {
                current = match guard("map function", || map(value)) {
                    Ok(mapped) => Node::Pure(mapped),
                    Err(error) => Node::Fail(error),
                };
            }
            Some(Frame::Map(map, false)) => {
                current = Node::Pure(map(value));
            }
            Some(Frame::Recover(_)) => {
                unreachable!("pop_continuation never yields error handlers")
            }
        }
        frame_index = model.next_frame_index(frame_index);
    }
}

/// One bounded cycle: reduce until the budget runs out or an effect that
/// cannot run synchronously is reached, then fold the live bind chain back
/// into a tree. Never starts `Async` registrations or memoized producers.
pub(crate) fn step(mut current: Node, model: ExecutionModel) -> Node {
    let mut b_first: Option<Frame> = None;
    let mut b_rest: Option<BindStack<Frame>> = None;
    let mut frame_index = model.next_frame_index(0);
    'outer: loop {
        if frame_index == 0 {
            return rebuild(current, b_first, b_rest);
        }

        let value = 'eval: {
            match current {
                Node::Bind { source, frame } => {
                    if let Some(previous) = b_first.take() {
                        b_rest.get_or_insert_with(BindStack::new).push(previous);
                    }
                    b_first = Some(frame);
                    current = source.into_node();
                    continue 'outer;
                }
                Node::Mapped { source, f, guarded } => {
                    if let Some(previous) = b_first.take() {
                        b_rest.get_or_insert_with(BindStack::new).push(previous);
                    }
                    b_first = Some(Frame::Map(f, guarded));
                    current = source.into_node();
                    continue 'outer;
                }
                Node::Pure(value) => break 'eval value,
                Node::Delay(thunk) => match guard_try("delayed thunk", || thunk()) {
                    Ok(value) => break 'eval value,
                    Err(error) => {
                        current = Node::Fail(error);
                        continue 'outer;
                    }
                },
                Node::Suspend(thunk) => {
                    current = match guard("suspended thunk", || thunk()) {
                        Ok(next) => next,
                        Err(error) => Node::Fail(error),
                    };
                    continue 'outer;
                }
                Node::Fail(error) => match take_recover(&mut b_first, &mut b_rest) {
                    None => return Node::Fail(error),
                    Some(handler) => {
                        current = match guard("error handler", || handler(error)) {
                            Ok(next) => next,
                            Err(follow_up) => Node::Fail(follow_up),
                        };
                        frame_index = model.next_frame_index(frame_index);
                        continue 'outer;
                    }
                },
                asynchronous @ Node::Async { .. } => {
                    return rebuild(asynchronous, b_first, b_rest);
                }
                Node::Memoized(cell) => match memo::peek(&cell) {
                    Some(Ok(value)) => break 'eval value,
                    Some(Err(error)) => {
                        current = Node::Fail(error);
                        continue 'outer;
                    }
                    None => return rebuild(Node::Memoized(cell), b_first, b_rest),
                },
            }
        };

        match pop_continuation(&mut b_first, &mut b_rest) {
            None => return Node::Pure(value),
            Some(Frame::Bind(bind)) => {
                current = match guard("bind continuation", || bind(value)) {
                    Ok(next) => next,
                    Err(error) => Node::Fail(error),
                };
            }
            Some(Frame::Map(map, true)) => {
                current = match guard("map function", || map(value)) {
                    Ok(mapped) => Node::Pure(mapped),
                    Err(error) => Node::Fail(error),
                };
            }
            Some(Frame::Map(map, false)) => {
                current = Node::Pure(map(value));
            }
            Some(Frame::Recover(_)) => {
                unreachable!("pop_continuation never yields error handlers")
            }
        }
        frame_index = model.next_frame_index(frame_index);
    }
}

/// Forced async boundary: park the whole loop state on the scheduler.
fn force_boundary(
    current: Node,
    context: Context,
    callback: RawCallback,
    b_first: Option<Frame>,
    b_rest: Option<BindStack<Frame>>,
) {
    context.frame_ref().reset();
    let locals = if context.options().propagate_locals {
        Some(LocalContext::snapshot())
    } else {
        None
    };
    let scheduler = context.scheduler().clone();
    let job: Runnable = Box::new(move || {
        if context.should_cancel() {
            return;
        }
        let frame = context.execution_model().next_frame_index(0);
        let run = move || execute(current, context, callback, b_first, b_rest, frame);
        match locals {
            Some(snapshot) => LocalContext::with_context(&snapshot, run),
            None => run(),
        }
    });
    scheduler.execute(job);
}

/// Hand the saved loop state to an `Async` registration.
fn submit_async(
    register: RegisterFn,
    context: Context,
    callback: RawCallback,
    b_first: Option<Frame>,
    b_rest: Option<BindStack<Frame>>,
    frame_index: usize,
) {
    // Best effort: resume the budget where we left off when the callback
    // fires synchronously on this thread. Any real migration reads 0.
    context.frame_ref().set(frame_index);
    let locals = if context.options().propagate_locals {
        Some(LocalContext::snapshot())
    } else {
        None
    };
    let registration_context = context.clone();
    let restart = RestartCallback::new(RestartState {
        context,
        callback,
        b_first,
        b_rest,
        locals,
    });
    if let Err(error) = guard("async registration", || {
        register(&registration_context, restart.clone())
    }) {
        // The single-shot flag absorbs the case where the registration
        // completed the callback before panicking.
        restart.signal(Err(error));
    }
}

/// Park the saved loop state on an in-flight memoization promise.
fn wait_on_promise(
    promise: Arc<OneShot<Outcome>>,
    context: Context,
    callback: RawCallback,
    b_first: Option<Frame>,
    b_rest: Option<BindStack<Frame>>,
) {
    let locals = if context.options().propagate_locals {
        Some(LocalContext::snapshot())
    } else {
        None
    };
    let waker_context = context.clone();
    let restart = RestartCallback::new(RestartState {
        context,
        callback,
        b_first,
        b_rest,
        locals,
    });
    promise.on_complete(move |outcome| {
        // Completion arrives on the producer's thread: a real async jump.
        waker_context.frame_ref().reset();
        let outcome = outcome.clone();
        execute_trampolined(Box::new(move || restart.signal(outcome)));
    });
}

/// Pop the next plain continuation; handler frames on the way are spent,
/// successes flow past them.
fn pop_continuation(
    b_first: &mut Option<Frame>,
    b_rest: &mut Option<BindStack<Frame>>,
) -> Option<Frame> {
    if let Some(frame) = b_first.take() {
        if !matches!(frame, Frame::Recover(_)) {
            return Some(frame);
        }
    }
    let stack = b_rest.as_mut()?;
    while let Some(frame) = stack.pop() {
        if !matches!(frame, Frame::Recover(_)) {
            return Some(frame);
        }
    }
    None
}

/// Pop the next error handler, discarding plain continuations on the way.
fn take_recover(
    b_first: &mut Option<Frame>,
    b_rest: &mut Option<BindStack<Frame>>,
) -> Option<RecoverFn> {
    if let Some(Frame::Recover(handler)) = b_first.take() {
        return Some(handler);
    }
    let stack = b_rest.as_mut()?;
    while let Some(frame) = stack.pop() {
        if let Frame::Recover(handler) = frame {
            return Some(handler);
        }
    }
    None
}

/// Fold a live bind chain back into a node tree, innermost frame first.
fn rebuild(current: Node, b_first: Option<Frame>, b_rest: Option<BindStack<Frame>>) -> Node {
    let mut node = current;
    if let Some(frame) = b_first {
        node = attach(node, frame);
    }
    if let Some(mut stack) = b_rest {
        while let Some(frame) = stack.pop() {
            node = attach(node, frame);
        }
    }
    node
}

fn attach(node: Node, frame: Frame) -> Node {
    match frame {
        Frame::Map(f, guarded) => Node::Mapped {
            source: Tail::new(node),
            f,
            guarded,
        },
        other => Node::Bind {
            source: Tail::new(node),
            frame: other,
        },
    }
}
