// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Batches and cursors.
//!
//! A [`Batch`] is a restartable generator: every call to
//! [`cursor`](Batch::cursor) starts a fresh iteration. A [`BatchCursor`] is
//! one stateful iteration; cloning a cursor *aliases* its state, the same
//! way two references to one iterator would. The engine only ever advances
//! a cursor from one consumer at a time.

use std::sync::Arc;

use parking_lot::Mutex;

/// Default number of elements a consumer should process from a cursor
/// before yielding.
pub const DEFAULT_RECOMMENDED_BATCH_SIZE: usize = 256;

struct CursorState<A> {
    iter: Box<dyn Iterator<Item = A> + Send>,
    peeked: Option<A>,
}

/// A stateful iteration over a bounded or unbounded element source.
pub struct BatchCursor<A> {
    state: Arc<Mutex<CursorState<A>>>,
    recommended: usize,
}

impl<A> Clone for BatchCursor<A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            recommended: self.recommended,
        }
    }
}

impl<A: Send + 'static> BatchCursor<A> {
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: Iterator<Item = A> + Send + 'static,
    {
        Self {
            state: Arc::new(Mutex::new(CursorState {
                iter: Box::new(iter),
                peeked: None,
            })),
            recommended: DEFAULT_RECOMMENDED_BATCH_SIZE,
        }
    }

    pub fn from_vec(items: Vec<A>) -> Self {
        Self::from_iter(items.into_iter())
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.recommended = size.max(1);
        self
    }

    /// Whether another element is available.
    ///
    /// May advance the underlying iterator; the element is buffered for the
    /// next [`next`](Self::next) call.
    pub fn has_next(&self) -> bool {
        let mut state = self.state.lock();
        if state.peeked.is_some() {
            return true;
        }
        state.peeked = state.iter.next();
        state.peeked.is_some()
    }

    pub fn next(&self) -> Option<A> {
        let mut state = self.state.lock();
        match state.peeked.take() {
            Some(item) => Some(item),
            None => state.iter.next(),
        }
    }

    /// How many elements a consumer should take before yielding.
    pub fn recommended_batch_size(&self) -> usize {
        self.recommended
    }

    /// A cursor over the transformed elements.
    ///
    /// The source cursor's state is consumed through the new one.
    pub fn map<B, F>(self, f: F) -> BatchCursor<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + 'static,
    {
        let recommended = self.recommended;
        BatchCursor::from_iter(CursorIter { cursor: self }.map(f)).with_batch_size(recommended)
    }
}

/// Iterator adapter draining a cursor.
pub(crate) struct CursorIter<A> {
    cursor: BatchCursor<A>,
}

impl<A: Send + 'static> Iterator for CursorIter<A> {
    type Item = A;

    fn next(&mut self) -> Option<A> {
        self.cursor.next()
    }
}

/// A restartable source of cursors.
pub struct Batch<A> {
    make: Arc<dyn Fn() -> BatchCursor<A> + Send + Sync>,
}

impl<A> Clone for Batch<A> {
    fn clone(&self) -> Self {
        Self {
            make: self.make.clone(),
        }
    }
}

impl<A: Clone + Send + Sync + 'static> Batch<A> {
    pub fn from_vec(items: Vec<A>) -> Self {
        Self::from_fn(move || BatchCursor::from_vec(items.clone()))
    }

    pub fn from_fn<F>(make: F) -> Self
    where
        F: Fn() -> BatchCursor<A> + Send + Sync + 'static,
    {
        Self {
            make: Arc::new(make),
        }
    }

    /// Start a fresh iteration.
    pub fn cursor(&self) -> BatchCursor<A> {
        (self.make)()
    }

    pub fn map<B, F>(self, f: F) -> Batch<B>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Batch::from_fn(move || {
            let f = f.clone();
            self.cursor().map(move |item| f(item))
        })
    }
}
