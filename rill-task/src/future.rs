// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cancelable future handle returned by `Task::run_as_future`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as PollContext, Poll};

use event_listener::{EventListener, Listener};
use rill_core::{CancelConnection, OneShot};
use rill_error::RillError;

/// Handle to a running (or already finished) task.
///
/// When the task completed synchronously the handle is born complete and
/// [`try_value`](Self::try_value) returns immediately; otherwise the handle
/// can be awaited, blocked on with [`join`](Self::join), or cancelled.
/// Cancelling suppresses delivery: a cancelled handle never resolves.
pub struct CancelableHandle<A> {
    promise: Arc<OneShot<Result<A, RillError>>>,
    connection: CancelConnection,
    listener: Option<EventListener>,
}

impl<A: Clone + Send + Sync + 'static> CancelableHandle<A> {
    pub(crate) fn new(
        promise: Arc<OneShot<Result<A, RillError>>>,
        connection: CancelConnection,
    ) -> Self {
        Self {
            promise,
            connection,
            listener: None,
        }
    }

    /// Cancel the underlying run.
    ///
    /// Cancellation is cooperative: a frame already on a thread runs to
    /// completion but its result is not delivered.
    pub fn cancel(&self) {
        self.connection.cancel();
    }

    /// The cancel connection of the underlying run.
    pub fn connection(&self) -> &CancelConnection {
        &self.connection
    }

    pub fn is_completed(&self) -> bool {
        self.promise.is_complete()
    }

    /// The outcome, when already available.
    pub fn try_value(&self) -> Option<Result<A, RillError>> {
        self.promise.try_get()
    }

    /// Block the current thread until the outcome arrives.
    pub fn join(self) -> Result<A, RillError> {
        loop {
            if let Some(outcome) = self.promise.try_get() {
                return outcome;
            }
            let listener = self.promise.listen();
            if let Some(outcome) = self.promise.try_get() {
                return outcome;
            }
            listener.wait();
        }
    }
}

impl<A: Clone + Send + Sync + 'static> Future for CancelableHandle<A> {
    type Output = Result<A, RillError>;

    fn poll(self: Pin<&mut Self>, cx: &mut PollContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            if let Some(outcome) = this.promise.try_get() {
                return Poll::Ready(outcome);
            }
            if this.listener.is_none() {
                this.listener = Some(this.promise.listen());
                // Re-check after registering: completion may have slipped
                // in between the first check and listen().
                if let Some(outcome) = this.promise.try_get() {
                    return Poll::Ready(outcome);
                }
            }
            match Pin::new(this.listener.as_mut().unwrap()).poll(cx) {
                Poll::Ready(()) => {
                    this.listener = None;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
