// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities for the rill workspace.
//!
//! The centrepiece is [`TestScheduler`]: a deterministic scheduler whose
//! queue is drained manually with [`tick`](TestScheduler::tick) /
//! [`run_all`](TestScheduler::run_all), so tests can single-step across
//! async boundaries and assert on reported failures. The rest are small
//! capture/record helpers shared by the interpreter and streaming tests.

pub mod dummy;
pub mod helpers;
pub mod recorder;
pub mod run;
pub mod scheduler;

pub use dummy::{dummy, is_dummy, DummyError};
pub use helpers::CapturedResult;
pub use recorder::Recorder;
pub use run::{run_err, run_ok, run_sync};
pub use scheduler::TestScheduler;
