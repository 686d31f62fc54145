// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The public task type and its combinators.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use rill_core::non_fatal::guard;
use rill_core::{CancelConnection, ExecutionModel, OneShot, SchedulerRef};
use rill_error::RillError;

use crate::callback::{RawCallback, RestartCallback, TaskCallback};
use crate::context::{Context, Options};
use crate::erased::{boxed, unbox};
use crate::frame::Frame;
use crate::future::CancelableHandle;
use crate::memo::MemoCell;
use crate::node::{Node, RegisterFn, Tail};
use crate::run_loop;

/// A lazy, re-runnable description of a computation producing `A` or
/// failing with [`RillError`].
///
/// Tasks are values: building one performs no work, and the same task can
/// be run any number of times. Evaluation is driven by one of the run
/// methods, each of which interprets the node tree on a stack-safe
/// trampoline.
///
/// The `Clone + Send + Sync + 'static` bound on `A` is what re-runnable
/// descriptions cost: a `Task::now` value may be handed out once per run,
/// and values may cross threads at async boundaries.
pub struct Task<A> {
    node: Node,
    _marker: PhantomData<fn() -> A>,
}

impl<A> Clone for Task<A> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A> fmt::Debug for Task<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("node", &describe(&self.node))
            .finish()
    }
}

impl<A: Clone + Send + Sync + 'static> Task<A> {
    pub(crate) fn from_node(node: Node) -> Self {
        Self {
            node,
            _marker: PhantomData,
        }
    }

    /// Lift an already-computed value.
    pub fn now(value: A) -> Self {
        Self::from_node(Node::Pure(boxed(value)))
    }

    /// Defer a synchronous, possibly side-effectful computation.
    ///
    /// The thunk runs once per task run, inside the non-fatal guard: a
    /// panic becomes an ordinary failure.
    pub fn eval<F>(f: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self::from_node(Node::Delay(Arc::new(move || Ok(boxed(f())))))
    }

    /// Defer a fallible synchronous computation.
    pub fn eval_try<F>(f: F) -> Self
    where
        F: Fn() -> Result<A, RillError> + Send + Sync + 'static,
    {
        Self::from_node(Node::Delay(Arc::new(move || f().map(boxed))))
    }

    /// Defer the construction of a whole task.
    pub fn defer<F>(f: F) -> Self
    where
        F: Fn() -> Task<A> + Send + Sync + 'static,
    {
        Self::from_node(Node::Suspend(Arc::new(move || f().node)))
    }

    /// Defer construction until the scheduler is known.
    ///
    /// The streaming engine uses this to reach the failure reporter from
    /// inside release logic; it is generally useful whenever a task's shape
    /// depends on where it runs.
    pub fn defer_action<F>(f: F) -> Self
    where
        F: Fn(&SchedulerRef) -> Task<A> + Send + Sync + 'static,
    {
        let register: RegisterFn = Arc::new(move |ctx: &Context, restart: Arc<RestartCallback>| {
            let task = match guard("deferred action", || f(ctx.scheduler())) {
                Ok(task) => task,
                Err(error) => Task::raise_error(error),
            };
            let completion: RawCallback = Box::new(move |outcome| restart.signal(outcome));
            run_loop::start(task.node, ctx.clone(), completion);
        });
        Self::from_node(Node::Async { register })
    }

    /// Lift a failure.
    pub fn raise_error(error: RillError) -> Self {
        Self::from_node(Node::Fail(error))
    }

    /// Lift a `Result`.
    pub fn from_result(outcome: Result<A, RillError>) -> Self {
        match outcome {
            Ok(value) => Self::now(value),
            Err(error) => Self::raise_error(error),
        }
    }

    /// A task that never completes.
    pub fn never() -> Self {
        Self::create(|_, _| {})
    }

    /// Escape hatch to external asynchrony.
    ///
    /// `register` is invoked on every run with the run's [`Context`] and a
    /// single-shot [`TaskCallback`]. The registration may complete the
    /// callback synchronously or from any other thread; only the first
    /// completion is delivered. Long-lived registrations should push a
    /// cancel token onto `context.connection()`.
    pub fn create<F>(register: F) -> Self
    where
        F: Fn(&Context, TaskCallback<A>) + Send + Sync + 'static,
    {
        let register: RegisterFn = Arc::new(move |ctx: &Context, restart: Arc<RestartCallback>| {
            register(ctx, TaskCallback::new(restart));
        });
        Self::from_node(Node::Async { register })
    }

    /// Transform the produced value.
    pub fn map<B, F>(self, f: F) -> Task<B>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Task::from_node(Node::Mapped {
            source: Tail::new(self.node),
            f: Arc::new(move |value| boxed(f(unbox::<A>(value)))),
            guarded: true,
        })
    }

    /// Like [`map`](Self::map) for mapping functions known not to fail;
    /// skips the panic guard.
    #[doc(hidden)]
    pub fn map_unguarded<B, F>(self, f: F) -> Task<B>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Task::from_node(Node::Mapped {
            source: Tail::new(self.node),
            f: Arc::new(move |value| boxed(f(unbox::<A>(value)))),
            guarded: false,
        })
    }

    /// Monadic sequencing.
    pub fn flat_map<B, F>(self, f: F) -> Task<B>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> Task<B> + Send + Sync + 'static,
    {
        Task::from_node(Node::Bind {
            source: Tail::new(self.node),
            frame: Frame::Bind(Arc::new(move |value| f(unbox::<A>(value)).node)),
        })
    }

    /// Replace a failure with the handler's continuation.
    ///
    /// Successful values flow past the handler untouched.
    pub fn on_error_handle_with<F>(self, f: F) -> Task<A>
    where
        F: Fn(RillError) -> Task<A> + Send + Sync + 'static,
    {
        Task::from_node(Node::Bind {
            source: Tail::new(self.node),
            frame: Frame::Recover(Arc::new(move |error| f(error).node)),
        })
    }

    /// Replace a failure with a plain value.
    pub fn on_error_recover<F>(self, f: F) -> Task<A>
    where
        F: Fn(RillError) -> A + Send + Sync + 'static,
    {
        self.on_error_handle_with(move |error| Task::now(f(error)))
    }

    /// Expose the outcome as a value.
    pub fn attempt(self) -> Task<Result<A, RillError>> {
        self.map(Ok)
            .on_error_handle_with(|error| Task::now(Err(error)))
    }

    /// Share one producer run between every run of the returned task,
    /// caching success and failure alike.
    pub fn memoize(self) -> Task<A> {
        if let Node::Memoized(cell) = &self.node {
            if cell.caches_errors() {
                return self;
            }
        }
        Task::from_node(Node::Memoized(Arc::new(MemoCell::new(self.node, true))))
    }

    /// Like [`memoize`](Self::memoize), but a failure resets the cell: the
    /// next run invokes the producer again.
    pub fn memoize_on_success(self) -> Task<A> {
        if let Node::Memoized(cell) = &self.node {
            if !cell.caches_errors() {
                return self;
            }
        }
        Task::from_node(Node::Memoized(Arc::new(MemoCell::new(self.node, false))))
    }

    /// Run with a completion callback and default options.
    ///
    /// The callback is invoked at most once, with success or failure; a
    /// cancelled run invokes it not at all. The returned connection cancels
    /// the run.
    pub fn run_with_callback<F>(&self, scheduler: &SchedulerRef, callback: F) -> CancelConnection
    where
        F: FnOnce(Result<A, RillError>) + Send + 'static,
    {
        self.run_with_options(scheduler, Options::default(), callback)
    }

    /// Run with a completion callback and explicit options.
    pub fn run_with_options<F>(
        &self,
        scheduler: &SchedulerRef,
        options: Options,
        callback: F,
    ) -> CancelConnection
    where
        F: FnOnce(Result<A, RillError>) + Send + 'static,
    {
        let context = Context::new(scheduler.clone(), options);
        let connection = context.connection().clone();
        let raw: RawCallback = Box::new(move |outcome| callback(outcome.map(unbox::<A>)));
        run_loop::start(self.node.clone(), context, raw);
        connection
    }

    /// Run, returning a cancelable handle.
    ///
    /// When no async boundary is encountered the handle is already complete
    /// on return (the synchronous fast path); otherwise it completes when
    /// the run does.
    pub fn run_as_future(&self, scheduler: &SchedulerRef) -> CancelableHandle<A> {
        self.run_as_future_with_options(scheduler, Options::default())
    }

    /// Like [`run_as_future`](Self::run_as_future) with explicit options.
    pub fn run_as_future_with_options(
        &self,
        scheduler: &SchedulerRef,
        options: Options,
    ) -> CancelableHandle<A> {
        let promise = Arc::new(OneShot::new());
        let completer = promise.clone();
        let connection = self.run_with_options(scheduler, options, move |outcome| {
            completer.try_complete(outcome);
        });
        CancelableHandle::new(promise, connection)
    }

    /// One trampoline cycle, without running async registrations or
    /// starting memoized producers.
    ///
    /// Returns the simplified remainder: `Task::now`/`raise_error` when the
    /// budget sufficed, otherwise the parked tree with its pending bind
    /// chain folded back in.
    pub fn step(&self, model: ExecutionModel) -> Task<A> {
        Task::from_node(run_loop::step(self.node.clone(), model))
    }
}

impl Task<()> {
    /// The completed unit task.
    pub fn unit() -> Task<()> {
        Task::now(())
    }

    /// A bare asynchronous boundary: completes on the scheduler.
    pub fn shift() -> Task<()> {
        Task::create(|ctx, callback| {
            ctx.scheduler().execute(Box::new(move || callback.success(())));
        })
    }
}

fn describe(node: &Node) -> &'static str {
    match node {
        Node::Pure(_) => "Pure",
        Node::Delay(_) => "Delay",
        Node::Suspend(_) => "Suspend",
        Node::Bind { .. } => "Bind",
        Node::Mapped { .. } => "Mapped",
        Node::Fail(_) => "Fail",
        Node::Async { .. } => "Async",
        Node::Memoized(_) => "Memoized",
    }
}
