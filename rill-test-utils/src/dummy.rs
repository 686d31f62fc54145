// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The canonical test failure.

use rill_error::RillError;

/// Error raised by tests that need a recognizable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dummy")]
pub struct DummyError;

/// A fresh `RillError` wrapping [`DummyError`].
pub fn dummy() -> RillError {
    RillError::raised(DummyError)
}

/// Whether `error` is the test dummy.
pub fn is_dummy(error: &RillError) -> bool {
    error.is::<DummyError>()
}
