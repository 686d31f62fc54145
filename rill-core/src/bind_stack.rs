// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Growable LIFO stack for the interpreter's overflow bind chain.
//!
//! The run loop keeps the most recent continuation in an inline scratch
//! slot; everything older spills into a `BindStack`. The stack only ever
//! grows (capacity doubles, never shrinks) because a bind chain that was
//! deep once tends to get deep again within the same run.

const INITIAL_CAPACITY: usize = 8;

/// A LIFO stack with doubling capacity and no steady-state shrink.
#[derive(Debug)]
pub struct BindStack<T> {
    items: Vec<T>,
}

impl<T> BindStack<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.items.capacity() {
            self.items.reserve_exact(self.items.capacity());
        }
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Most recently pushed item, without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for BindStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifo_order() {
        let mut stack = BindStack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut stack = BindStack::new();
        for i in 0..1000 {
            stack.push(i);
        }
        assert_eq!(stack.len(), 1000);
        for i in (0..1000).rev() {
            assert_eq!(stack.pop(), Some(i));
        }
        assert!(stack.is_empty());
    }

    #[test]
    fn capacity_does_not_shrink_after_drain() {
        let mut stack = BindStack::new();
        for i in 0..512 {
            stack.push(i);
        }
        let grown = stack.items.capacity();
        while stack.pop().is_some() {}
        assert_eq!(stack.items.capacity(), grown);
    }
}
