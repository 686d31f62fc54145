// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Rill
//!
//! A purely functional effect runtime for Rust, in two layers:
//!
//! - [`Task`]: a lazy, re-runnable description of a computation, evaluated
//!   by a stack-safe trampoline with frame budgeting, asynchronous
//!   boundaries, cooperative cancellation and memoization.
//! - [`Flow`]: a pull-based stream whose tails are tasks, with batched
//!   element production, error interception and bracketed resources that
//!   release exactly once on every termination path.
//!
//! Evaluation is driven by a [`Scheduler`]; the crate ships a Tokio-backed
//! implementation (feature `runtime-tokio`, on by default), a smol-backed
//! one (`runtime-smol`), and the synchronous [`TrampolineScheduler`].
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use rill::{Flow, SchedulerRef, Task, TrampolineScheduler};
//!
//! let scheduler: SchedulerRef = Arc::new(TrampolineScheduler::default());
//!
//! let total = Flow::of([10, 20, 30, 40, 50])
//!     .drop_while_with_index(|x, i| *x < 30 || i < 2)
//!     .fold_task(0, |acc, x| acc + x);
//!
//! let handle = total.run_as_future(&scheduler);
//! assert_eq!(handle.try_value().unwrap().unwrap(), 120);
//! ```

// Re-export the task layer
pub use rill_task::{CancelableHandle, Context, Options, Task, TaskCallback};

// Re-export the stream layer
pub use rill_stream::{Batch, BatchCursor, ExitCase, Flow, ScopeResource};

// Re-export the support layer
pub use rill_core::{
    BindStack, BooleanCancelable, CancelConnection, Cancelable, CancelableFn, ExecutionModel,
    Local, LocalContext, OneShot, Runnable, Scheduler, SchedulerRef, TrampolineScheduler,
};

#[cfg(feature = "runtime-smol")]
pub use rill_core::SmolScheduler;
#[cfg(feature = "runtime-tokio")]
pub use rill_core::TokioScheduler;

pub use rill_error::{Result, RillError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{ExecutionModel, ExitCase, Flow, Scheduler, SchedulerRef, Task};
    pub use rill_error::{Result, RillError};
}
