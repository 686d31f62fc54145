// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! How a scope ended.

use rill_error::RillError;

/// Discriminant passed to a scope's release callback, exactly once.
#[derive(Debug, Clone)]
pub enum ExitCase {
    /// The inner stream was fully consumed.
    Completed,
    /// A downstream consumer abandoned the stream before its end.
    EarlyStop,
    /// An error surfaced from inside the scope.
    Error(RillError),
}

impl ExitCase {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExitCase::Completed)
    }

    pub fn is_early_stop(&self) -> bool {
        matches!(self, ExitCase::EarlyStop)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExitCase::Error(_))
    }
}
