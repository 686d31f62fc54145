// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Trampolined task interpreter.
//!
//! A [`Task`] is a pure description of a computation: a tree of deferred
//! nodes that does nothing until one of the run methods interprets it. The
//! interpreter is a single loop that turns arbitrarily deep chains of
//! `flat_map`/`map` into iteration, yields to the [`Scheduler`] once per
//! frame budget, and re-enters itself when asynchronous registrations
//! complete.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use rill_core::{SchedulerRef, TrampolineScheduler};
//! use rill_task::Task;
//!
//! let scheduler: SchedulerRef = Arc::new(TrampolineScheduler::default());
//! let task = Task::eval(|| 1).flat_map(|x| Task::now(x + 2));
//!
//! let handle = task.run_as_future(&scheduler);
//! assert_eq!(handle.try_value().unwrap().unwrap(), 3);
//! ```
//!
//! [`Scheduler`]: rill_core::Scheduler

mod callback;
mod context;
mod erased;
mod frame;
mod future;
mod memo;
mod node;
mod run_loop;
mod task;

pub use callback::TaskCallback;
pub use context::{Context, Options};
pub use future::CancelableHandle;
pub use task::Task;

pub use rill_error::{Result, RillError};
