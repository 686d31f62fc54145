// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Pull-based streaming on top of the task interpreter.
//!
//! A [`Flow`] is a lazily unfolding sequence whose tails are [`Task`]
//! values: nothing is produced until a consumer pulls, and every pull goes
//! through the trampoline, so streams of any length evaluate in constant
//! stack. Elements travel one at a time ([`Flow::Next`]) or in batches
//! ([`Flow::NextBatch`], [`Flow::NextCursor`]); resources acquired with
//! [`Flow::bracket`] are released exactly once on every termination path.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use rill_core::{SchedulerRef, TrampolineScheduler};
//! use rill_stream::Flow;
//!
//! let scheduler: SchedulerRef = Arc::new(TrampolineScheduler::default());
//! let doubled = Flow::of([1, 2, 3]).map(|x| x * 2).to_vec_task();
//!
//! let handle = doubled.run_as_future(&scheduler);
//! assert_eq!(handle.try_value().unwrap().unwrap(), vec![2, 4, 6]);
//! ```
//!
//! [`Task`]: rill_task::Task

mod attempt;
mod batch;
mod consume;
mod do_on_early_stop;
mod drop_while_with_index;
mod exit_case;
mod flow;
mod map;
mod on_error;
mod scope;
mod take;

pub use batch::{Batch, BatchCursor, DEFAULT_RECOMMENDED_BATCH_SIZE};
pub use exit_case::ExitCase;
pub use flow::Flow;
pub use scope::{ReleaseFn, ScopeResource, UseFn};

pub use rill_error::{Result, RillError};
