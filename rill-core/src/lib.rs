// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Support primitives for the rill effect runtime.
//!
//! This crate hosts everything the task interpreter and the streaming engine
//! rely on but which is not itself part of either node tree:
//!
//! - the [`Scheduler`] contract and its runtime-backed implementations,
//! - the [`ExecutionModel`] frame-budget arithmetic,
//! - cancellation primitives ([`Cancelable`], [`CancelConnection`]),
//! - the [`non_fatal`] guard separating recoverable failures from fatal
//!   host conditions,
//! - context-local propagation ([`Local`], [`LocalContext`]),
//! - the [`BindStack`] continuation stack, the [`OneShot`] completion cell
//!   and the [`PaddedCell`] CAS cell the memoization machinery builds on.

pub mod bind_stack;
pub mod cancelable;
pub mod exec_model;
pub mod local;
pub mod logging;
pub mod non_fatal;
pub mod one_shot;
pub mod padded_cell;
pub mod scheduler;

pub use bind_stack::BindStack;
pub use cancelable::{BooleanCancelable, CancelConnection, Cancelable, CancelableFn};
pub use exec_model::ExecutionModel;
pub use local::{Local, LocalContext};
pub use one_shot::OneShot;
pub use padded_cell::PaddedCell;
pub use scheduler::{Runnable, Scheduler, SchedulerRef, TrampolineScheduler};

#[cfg(feature = "runtime-smol")]
pub use scheduler::SmolScheduler;
#[cfg(feature = "runtime-tokio")]
pub use scheduler::TokioScheduler;

// Re-export the error crate so downstream crates take a single dependency.
pub use rill_error::{Result, RillError};
