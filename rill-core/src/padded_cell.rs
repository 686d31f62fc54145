// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cache-line padded CAS cell.
//!
//! The memoization resolver races concurrent runners on a single shared
//! slot; padding keeps that slot from false-sharing with neighbouring
//! allocations, and the `Arc`-swap representation lets state transitions be
//! plain pointer compare-and-swaps over immutable state values.

use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_utils::CachePadded;

/// A padded atomic cell over immutable state values.
pub struct PaddedCell<T> {
    slot: CachePadded<ArcSwap<T>>,
}

impl<T> PaddedCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            slot: CachePadded::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Current state.
    pub fn load(&self) -> Arc<T> {
        self.slot.load_full()
    }

    /// Atomically replace `current` with `next`.
    ///
    /// Returns `true` when the swap happened; `false` means another thread
    /// transitioned the cell first and the caller should re-read.
    pub fn compare_exchange(&self, current: &Arc<T>, next: Arc<T>) -> bool {
        let previous = self.slot.compare_and_swap(current, next);
        Arc::ptr_eq(&previous, current)
    }

    /// Unconditional store.
    pub fn store(&self, next: Arc<T>) {
        self.slot.store(next);
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PaddedCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PaddedCell").field(&self.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_exchange_succeeds_on_current() {
        let cell = PaddedCell::new(1u32);
        let current = cell.load();
        assert!(cell.compare_exchange(&current, Arc::new(2)));
        assert_eq!(*cell.load(), 2);
    }

    #[test]
    fn compare_exchange_fails_on_stale() {
        let cell = PaddedCell::new(1u32);
        let stale = cell.load();
        cell.store(Arc::new(5));
        assert!(!cell.compare_exchange(&stale, Arc::new(9)));
        assert_eq!(*cell.load(), 5);
    }

    #[test]
    fn racing_writers_produce_one_winner() {
        let cell = Arc::new(PaddedCell::new(0u32));
        let current = cell.load();
        let mut handles = Vec::new();
        let wins = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        for i in 1..=8u32 {
            let cell = cell.clone();
            let current = current.clone();
            let wins = wins.clone();
            handles.push(std::thread::spawn(move || {
                if cell.compare_exchange(&current, Arc::new(i)) {
                    wins.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(wins.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_ne!(*cell.load(), 0);
    }
}
