// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The scheduler contract and its implementations.
//!
//! The interpreter never spawns threads of its own; every departure from
//! the current call stack goes through a [`Scheduler`]. An implementation
//! supplies three things: a way to run a closure later ([`execute`]), the
//! frame budget for synchronous reduction ([`execution_model`]), and a sink
//! for failures that have no handler left ([`report_failure`]).
//!
//! [`execute`]: Scheduler::execute
//! [`execution_model`]: Scheduler::execution_model
//! [`report_failure`]: Scheduler::report_failure

use std::sync::Arc;

use crate::exec_model::ExecutionModel;
use rill_error::RillError;

mod trampoline;
pub use trampoline::{execute_trampolined, TrampolineScheduler};

#[cfg(feature = "runtime-smol")]
mod smol_impl;
#[cfg(feature = "runtime-smol")]
pub use smol_impl::SmolScheduler;

#[cfg(feature = "runtime-tokio")]
mod tokio_impl;
#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::TokioScheduler;

/// A unit of work handed to a scheduler.
pub type Runnable = Box<dyn FnOnce() + Send + 'static>;

/// Execution capability consumed by the run loop.
pub trait Scheduler: Send + Sync + 'static {
    /// Run `runnable` at some later point, possibly on another thread.
    fn execute(&self, runnable: Runnable);

    /// The frame budget applied to run spans submitted to this scheduler.
    fn execution_model(&self) -> ExecutionModel {
        ExecutionModel::default()
    }

    /// Sink for errors that escaped every handler: duplicate callback
    /// completions, release failures shadowed by an earlier error, and
    /// failures of fire-and-forget runnables.
    fn report_failure(&self, error: &RillError);
}

/// Shared handle to a scheduler.
pub type SchedulerRef = Arc<dyn Scheduler>;
