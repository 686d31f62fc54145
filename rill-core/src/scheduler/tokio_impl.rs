// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use super::{Runnable, Scheduler};
use crate::exec_model::ExecutionModel;
use crate::logging;
use rill_error::RillError;

/// Scheduler backed by a Tokio runtime.
///
/// Runnables are spawned as ordinary tasks on the wrapped handle; the frame
/// budget defaults to [`ExecutionModel::default`].
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
    model: ExecutionModel,
}

impl TokioScheduler {
    /// Wrap the runtime the caller is currently inside.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, like
    /// `tokio::runtime::Handle::current`.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current(), ExecutionModel::default())
    }

    pub fn new(handle: tokio::runtime::Handle, model: ExecutionModel) -> Self {
        Self { handle, model }
    }
}

impl Scheduler for TokioScheduler {
    fn execute(&self, runnable: Runnable) {
        let _ = self.handle.spawn(async move {
            runnable();
        });
    }

    fn execution_model(&self) -> ExecutionModel {
        self.model
    }

    fn report_failure(&self, error: &RillError) {
        logging::error!("unhandled failure: {error}");
    }
}
