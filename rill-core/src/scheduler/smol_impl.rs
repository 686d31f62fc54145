// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use super::{Runnable, Scheduler};
use crate::exec_model::ExecutionModel;
use crate::logging;
use rill_error::RillError;

/// Scheduler backed by the smol global executor.
#[derive(Clone, Debug, Default)]
pub struct SmolScheduler {
    model: ExecutionModel,
}

impl SmolScheduler {
    pub fn new(model: ExecutionModel) -> Self {
        Self { model }
    }
}

impl Scheduler for SmolScheduler {
    fn execute(&self, runnable: Runnable) {
        smol::spawn(async move {
            runnable();
        })
        .detach();
    }

    fn execution_model(&self) -> ExecutionModel {
        self.model
    }

    fn report_failure(&self, error: &RillError) {
        logging::error!("unhandled failure: {error}");
    }
}
