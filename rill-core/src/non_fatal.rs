// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Non-fatal error classification and the evaluation guard.
//!
//! User code reaches the interpreter as closures: thunks, continuations,
//! stream rewriter bodies. Any of them may panic. The [`guard`] function is
//! the single chokepoint that turns a non-fatal panic into a
//! [`RillError::Panicked`] value flowing down the ordinary error channel,
//! while letting fatal conditions unwind untouched.
//!
//! Host-level faults that abort the process (out-of-memory, stack
//! exhaustion) never reach `catch_unwind`, so the only classification left
//! to do in-process is the [`FatalShutdown`] marker: a payload that
//! deliberately escapes every handler.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rill_error::RillError;

/// Panic payload that is never trapped by [`guard`].
///
/// Raising `std::panic::panic_any(FatalShutdown("reason"))` unwinds through
/// every error handler, the same way a virtual-machine-level fault would.
#[derive(Debug)]
pub struct FatalShutdown(pub &'static str);

/// Whether a caught panic payload may be converted into an error value.
pub fn is_non_fatal(payload: &(dyn Any + Send)) -> bool {
    !payload.is::<FatalShutdown>()
}

/// Run `f`, trapping non-fatal panics as [`RillError::Panicked`].
///
/// `context` names the evaluation site and ends up in the error message.
pub fn guard<T>(context: &'static str, f: impl FnOnce() -> T) -> Result<T, RillError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => {
            if !is_non_fatal(payload.as_ref()) {
                panic::resume_unwind(payload);
            }
            Err(RillError::Panicked {
                context: format!("{context}: {}", panic_message(payload.as_ref())),
            })
        }
    }
}

/// Like [`guard`], for closures that already return a `Result`.
///
/// A returned `Err` and a trapped panic end up in the same channel.
pub fn guard_try<T>(
    context: &'static str,
    f: impl FnOnce() -> Result<T, RillError>,
) -> Result<T, RillError> {
    guard(context, f).and_then(|r| r)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "opaque panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_values_through() {
        assert_eq!(guard("test", || 42).unwrap(), 42);
    }

    #[test]
    fn traps_panics_with_context() {
        let err = guard("eval thunk", || -> u32 { panic!("boom") }).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("eval thunk"), "missing context: {text}");
        assert!(text.contains("boom"), "missing message: {text}");
    }

    #[test]
    fn fatal_payloads_escape() {
        let outcome = panic::catch_unwind(|| {
            let _ = guard("test", || panic::panic_any(FatalShutdown("halt")));
        });
        assert!(outcome.is_err());
    }

    #[test]
    fn guard_try_flattens() {
        let err = guard_try("test", || Err::<(), _>(RillError::message("no"))).unwrap_err();
        assert_eq!(err.to_string(), "no");
    }
}
