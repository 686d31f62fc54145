// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! At-most-once completion cell.
//!
//! A `OneShot` is the promise half of the engine: memoized tasks complete
//! one to fan a result out to every queued waiter, and the cancelable
//! future handle polls one through an `event-listener` notification.
//!
//! Completion hooks registered before the value arrives run on the
//! completing thread, after the internal lock is released; hooks registered
//! after completion run immediately on the registering thread.

use event_listener::{Event, EventListener, Listener};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

type Hook<T> = Box<dyn FnOnce(&T) + Send>;

enum State<T> {
    Pending(Vec<Hook<T>>),
    Done(T),
}

pub struct OneShot<T> {
    done: AtomicBool,
    state: Mutex<State<T>>,
    event: Event,
}

impl<T: Clone> OneShot<T> {
    pub fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
            state: Mutex::new(State::Pending(Vec::new())),
            event: Event::new(),
        }
    }

    /// Whether a value has been installed.
    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Install the value, waking listeners and draining hooks.
    ///
    /// Returns `false` when the cell was already complete; the second value
    /// is dropped.
    pub fn try_complete(&self, value: T) -> bool {
        let hooks = {
            let mut state = self.state.lock();
            if matches!(&*state, State::Done(_)) {
                return false;
            }
            match std::mem::replace(&mut *state, State::Done(value.clone())) {
                State::Pending(hooks) => hooks,
                State::Done(_) => unreachable!("completion raced inside the lock"),
            }
        };
        // Flag and notification happen after the state write so observers of
        // `is_complete` always find the value.
        self.done.store(true, Ordering::Release);
        self.event.notify(usize::MAX);
        for hook in hooks {
            hook(&value);
        }
        true
    }

    /// Run `hook` with the value, now or upon completion.
    pub fn on_complete<F>(&self, hook: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let ready = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending(hooks) => {
                    hooks.push(Box::new(hook));
                    return;
                }
                State::Done(value) => value.clone(),
            }
        };
        hook(&ready);
    }

    /// The value, if complete.
    pub fn try_get(&self) -> Option<T> {
        if !self.is_complete() {
            return None;
        }
        match &*self.state.lock() {
            State::Done(value) => Some(value.clone()),
            State::Pending(_) => None,
        }
    }

    /// Register interest in the completion notification.
    ///
    /// Callers must re-check [`is_complete`](Self::is_complete) after
    /// listening; completion may have slipped in between.
    pub fn listen(&self) -> EventListener {
        self.event.listen()
    }
}

impl<T: Clone> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[test]
    fn completes_once() {
        let cell = OneShot::new();
        assert!(cell.try_complete(1));
        assert!(!cell.try_complete(2));
        assert_eq!(cell.try_get(), Some(1));
    }

    #[test]
    fn hooks_before_and_after_completion() {
        let cell = OneShot::new();
        let seen = Arc::new(AtomicU32::new(0));

        let early = seen.clone();
        cell.on_complete(move |v| {
            early.fetch_add(*v, Ordering::SeqCst);
        });
        cell.try_complete(10);

        let late = seen.clone();
        cell.on_complete(move |v| {
            late.fetch_add(*v, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn listener_wakes_on_completion() {
        let cell = Arc::new(OneShot::new());
        let listener = cell.listen();
        let remote = cell.clone();
        let handle = std::thread::spawn(move || {
            remote.try_complete(42);
        });
        listener.wait();
        assert_eq!(cell.try_get(), Some(42));
        handle.join().unwrap();
    }
}
