// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Capture helpers for callback-style assertions.

use std::sync::Arc;

use parking_lot::Mutex;
use rill_error::RillError;

/// A slot that captures the single outcome of a task run.
///
/// Pass [`callback`](Self::callback) to `run_with_callback`, drive the
/// scheduler, then assert through [`value`](Self::value) /
/// [`error`](Self::error). The accessors panic with a readable message when
/// the run has not delivered (or delivered the other arm), which is exactly
/// what a test wants.
#[derive(Clone)]
pub struct CapturedResult<T> {
    slot: Arc<Mutex<Option<Result<T, RillError>>>>,
}

impl<T: Clone + Send + 'static> CapturedResult<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// A callback that stores the outcome into this capture.
    pub fn callback(&self) -> impl FnOnce(Result<T, RillError>) + Send + 'static {
        let slot = self.slot.clone();
        move |outcome| {
            let mut slot = slot.lock();
            assert!(slot.is_none(), "callback delivered more than once");
            *slot = Some(outcome);
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn get(&self) -> Option<Result<T, RillError>> {
        self.slot.lock().clone()
    }

    /// The success value.
    ///
    /// # Panics
    ///
    /// Panics when nothing was delivered or the run failed.
    pub fn value(&self) -> T {
        match self.get() {
            Some(Ok(value)) => value,
            Some(Err(error)) => panic!("expected success but the run failed: {error}"),
            None => panic!("expected success but nothing was delivered"),
        }
    }

    /// The failure.
    ///
    /// # Panics
    ///
    /// Panics when nothing was delivered or the run succeeded.
    pub fn error(&self) -> RillError {
        match self.get() {
            Some(Err(error)) => error,
            Some(Ok(_)) => panic!("expected failure but the run succeeded"),
            None => panic!("expected failure but nothing was delivered"),
        }
    }
}

impl<T: Clone + Send + 'static> Default for CapturedResult<T> {
    fn default() -> Self {
        Self::new()
    }
}
