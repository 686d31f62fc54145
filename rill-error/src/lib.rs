// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for the rill effect runtime.
//!
//! This crate defines [`RillError`], the single error channel flowing through
//! the task interpreter and the streaming engine. The type is `Clone` on
//! purpose: memoized tasks deliver the same failure to every waiter, and
//! `attempt`-style stream operators turn a failure into a stream element,
//! both of which duplicate the error value.
//!
//! # Examples
//!
//! ```
//! use rill_error::{RillError, Result};
//!
//! fn parse_input(raw: &str) -> Result<u32> {
//!     raw.trim()
//!         .parse()
//!         .map_err(RillError::raised)
//! }
//!
//! assert!(parse_input("42").is_ok());
//! assert!(parse_input("not a number").is_err());
//! ```

use std::sync::Arc;

/// Root error type for task and stream evaluation.
///
/// Every recoverable failure the interpreter can observe is represented
/// here. Fatal host-level conditions (out-of-memory, aborting panics) are
/// never converted into a `RillError`; they bypass every handler.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RillError {
    /// A user-raised error value.
    ///
    /// Arbitrary error types are carried behind an `Arc` so the value stays
    /// cheap to clone when it fans out to multiple observers.
    #[error("{0}")]
    Raised(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// A plain-text failure, for call sites that have no richer error value.
    #[error("{0}")]
    Message(Arc<str>),

    /// A user-provided closure panicked during evaluation.
    ///
    /// Non-fatal panics raised inside thunks, continuations and stream
    /// rewriters are caught and converted to this variant. The context names
    /// the evaluation site that trapped the panic.
    #[error("user callback panicked: {context}")]
    Panicked {
        /// Description of where the panic was trapped.
        context: String,
    },

    /// A callback that accepts at most one completion was invoked again.
    ///
    /// The duplicate completion is never delivered to user code; it is
    /// reported to the scheduler's failure reporter wrapped in this variant.
    #[error("callback invoked more than once: {context}")]
    DuplicateCallback {
        /// Description of the offending callback.
        context: String,
    },
}

impl RillError {
    /// Wrap an arbitrary error value.
    pub fn raised<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RillError::Raised(Arc::new(error))
    }

    /// Build a text-only error.
    pub fn message(msg: impl Into<String>) -> Self {
        RillError::Message(Arc::from(msg.into()))
    }

    /// Whether this error wraps a user value of concrete type `E`.
    ///
    /// Useful in tests and in handlers that only want to intercept a
    /// specific failure.
    pub fn is<E>(&self) -> bool
    where
        E: std::error::Error + 'static,
    {
        match self {
            RillError::Raised(inner) => inner.is::<E>(),
            _ => false,
        }
    }

    /// Downcast to the wrapped user error, if the types line up.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            RillError::Raised(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, RillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("dummy")]
    struct Dummy;

    #[test]
    fn raised_preserves_display() {
        let err = RillError::raised(Dummy);
        assert_eq!(err.to_string(), "dummy");
    }

    #[test]
    fn downcast_roundtrip() {
        let err = RillError::raised(Dummy);
        assert!(err.is::<Dummy>());
        assert!(err.downcast_ref::<Dummy>().is_some());

        let other = RillError::message("boom");
        assert!(!other.is::<Dummy>());
    }

    #[test]
    fn clones_share_the_source() {
        let err = RillError::raised(Dummy);
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }
}
