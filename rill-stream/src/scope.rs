// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Scoped-resource plumbing.
//!
//! `Flow::Scope` stores its resource type-erased so the node tree stays
//! monomorphic; [`Flow::bracket`] erases on the way in and downcasts on the
//! way out. Consumers wrap each opened scope in a [`ReleaseOnce`], the
//! at-most-once release guard that makes "exactly one release per acquire"
//! hold on every termination path.
//!
//! [`Flow::bracket`]: crate::flow::Flow::bracket

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rill_task::Task;

use crate::exit_case::ExitCase;
use crate::flow::Flow;

/// Type-erased scope resource.
pub type ScopeResource = Arc<dyn Any + Send + Sync>;

/// Continuation from an acquired resource into the scope's inner stream.
pub type UseFn<A> = Arc<dyn Fn(ScopeResource) -> Flow<A> + Send + Sync>;

/// Finalizer descriptor of a scope.
pub type ReleaseFn = Arc<dyn Fn(ScopeResource, ExitCase) -> Task<()> + Send + Sync>;

pub(crate) fn expect_resource<R: Send + Sync + 'static>(resource: ScopeResource) -> Arc<R> {
    match resource.downcast::<R>() {
        Ok(typed) => typed,
        Err(_) => unreachable!("scope resource did not match its bracket type"),
    }
}

/// An open scope's release, guarded to fire at most once.
#[derive(Clone)]
pub(crate) struct ReleaseOnce {
    fired: Arc<AtomicBool>,
    release: ReleaseFn,
    resource: ScopeResource,
}

impl ReleaseOnce {
    pub(crate) fn new(release: ReleaseFn, resource: ScopeResource) -> Self {
        Self {
            fired: Arc::new(AtomicBool::new(false)),
            release,
            resource,
        }
    }

    /// Run the release with `exit`; later calls are no-ops.
    ///
    /// Failures propagate to the caller.
    pub(crate) fn run(&self, exit: ExitCase) -> Task<()> {
        let this = self.clone();
        Task::defer(move || {
            if this.fired.swap(true, Ordering::AcqRel) {
                Task::unit()
            } else {
                (this.release)(this.resource.clone(), exit.clone())
            }
        })
    }

    /// Like [`run`](Self::run), but a failing release is reported to the
    /// scheduler instead of propagating. Used while another error is
    /// already on its way to the user.
    pub(crate) fn run_quiet(&self, exit: ExitCase) -> Task<()> {
        self.run(exit).on_error_handle_with(|error| {
            Task::defer_action(move |scheduler| {
                scheduler.report_failure(&error);
                Task::unit()
            })
        })
    }
}
