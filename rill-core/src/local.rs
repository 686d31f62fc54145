// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Context-local propagation across asynchronous boundaries.
//!
//! A [`Local`] is a key into the per-thread [`LocalContext`] map. On its own
//! a thread-local map would be lost at every scheduler hop; the interpreter
//! therefore snapshots the map at async submission time (when the
//! `propagate_locals` option is set) and reinstates the snapshot around the
//! continuation, restoring the prior context on exit. Correctness never
//! depends on ambient thread-local state surviving a jump.
//!
//! # Example
//!
//! ```
//! use rill_core::{Local, LocalContext};
//!
//! let request_id = Local::new(0u64);
//! request_id.set(17);
//!
//! let snapshot = LocalContext::snapshot();
//! request_id.set(99);
//!
//! let seen = LocalContext::with_context(&snapshot, || *request_id.get());
//! assert_eq!(seen, 17);
//! assert_eq!(*request_id.get(), 99);
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_KEY: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT: RefCell<LocalContext> = RefCell::new(LocalContext::default());
}

/// Immutable snapshot of every live [`Local`] binding on the current thread.
#[derive(Clone, Default)]
pub struct LocalContext {
    bindings: HashMap<usize, Arc<dyn Any + Send + Sync>>,
}

impl LocalContext {
    /// Capture the current thread's bindings.
    pub fn snapshot() -> LocalContext {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Install `context`, run `f`, then restore the previous context.
    ///
    /// The previous context is restored even when `f` unwinds.
    pub fn with_context<R>(context: &LocalContext, f: impl FnOnce() -> R) -> R {
        let previous = CURRENT.with(|current| current.replace(context.clone()));
        let _restore = RestoreOnDrop {
            previous: Some(previous),
        };
        f()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

struct RestoreOnDrop {
    previous: Option<LocalContext>,
}

impl Drop for RestoreOnDrop {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            CURRENT.with(|current| {
                *current.borrow_mut() = previous;
            });
        }
    }
}

/// A context-local variable.
///
/// Cloning a `Local` yields another handle to the same slot.
pub struct Local<T> {
    key: usize,
    default: Arc<T>,
}

impl<T> Clone for Local<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            default: self.default.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Local<T> {
    /// Allocate a fresh slot with the given default value.
    pub fn new(default: T) -> Self {
        Self {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            default: Arc::new(default),
        }
    }

    /// Current binding on this thread, or the default.
    pub fn get(&self) -> Arc<T> {
        CURRENT.with(|current| {
            current
                .borrow()
                .bindings
                .get(&self.key)
                .cloned()
                .and_then(|any| any.downcast::<T>().ok())
                .unwrap_or_else(|| self.default.clone())
        })
    }

    /// Bind a new value on this thread.
    pub fn set(&self, value: T) {
        CURRENT.with(|current| {
            current
                .borrow_mut()
                .bindings
                .insert(self.key, Arc::new(value));
        });
    }

    /// Drop this thread's binding, reverting to the default.
    pub fn clear(&self) {
        CURRENT.with(|current| {
            current.borrow_mut().bindings.remove(&self.key);
        });
    }
}
