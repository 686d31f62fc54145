// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cancellation tokens and the per-run cancel connection.
//!
//! Cancellation in the engine is cooperative: a run span that is already on
//! a thread executes to completion, but its result is suppressed, and every
//! token registered by asynchronous registrations is invoked. Tokens are
//! invoked in reverse registration order so later acquisitions unwind first.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something that can be cancelled exactly once.
///
/// Implementations must tolerate repeated `cancel` calls.
pub trait Cancelable: Send + Sync {
    fn cancel(&self);
}

/// A cancelable wrapping a plain closure.
pub struct CancelableFn(Box<dyn Fn() + Send + Sync>);

impl CancelableFn {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self(Box::new(f)))
    }
}

impl Cancelable for CancelableFn {
    fn cancel(&self) {
        (self.0)();
    }
}

/// A cancelable that only records the request.
#[derive(Debug, Default)]
pub struct BooleanCancelable {
    flag: AtomicBool,
}

impl BooleanCancelable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Cancelable for BooleanCancelable {
    fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// The cancel-handle stack owned by one task run.
///
/// Asynchronous registrations push their own token; `cancel` drains the
/// stack and invokes every token in LIFO order. Pushing onto an already
/// cancelled connection cancels the token immediately.
///
/// Cloning shares the underlying stack.
#[derive(Clone)]
pub struct CancelConnection {
    inner: Arc<Inner>,
}

struct Inner {
    canceled: AtomicBool,
    tokens: Mutex<Vec<Arc<dyn Cancelable>>>,
}

impl CancelConnection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                canceled: AtomicBool::new(false),
                tokens: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// Register a token, or cancel it right away when the connection is
    /// already cancelled.
    pub fn push(&self, token: Arc<dyn Cancelable>) {
        if self.is_canceled() {
            token.cancel();
            return;
        }
        let mut tokens = self.inner.tokens.lock();
        if self.is_canceled() {
            // Lost the race against cancel(); the drain already ran.
            drop(tokens);
            token.cancel();
        } else {
            tokens.push(token);
        }
    }

    /// Remove and return the most recently pushed token.
    pub fn pop(&self) -> Option<Arc<dyn Cancelable>> {
        self.inner.tokens.lock().pop()
    }

    /// Cancel the connection and every registered token, newest first.
    ///
    /// Idempotent; concurrent calls drain the stack once.
    pub fn cancel(&self) {
        if self.inner.canceled.swap(true, Ordering::AcqRel) {
            return;
        }
        let drained = std::mem::take(&mut *self.inner.tokens.lock());
        for token in drained.into_iter().rev() {
            token.cancel();
        }
    }
}

impl Cancelable for CancelConnection {
    fn cancel(&self) {
        CancelConnection::cancel(self);
    }
}

impl Default for CancelConnection {
    fn default() -> Self {
        Self::new()
    }
}
