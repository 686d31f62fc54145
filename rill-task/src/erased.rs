// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Type-erased values flowing through the run loop.
//!
//! The interpreter is one monomorphic function; the values it moves between
//! continuations are erased to cloneable `Any` boxes. The typed [`Task`]
//! wrapper guarantees by construction that a value reaching a continuation
//! has the type that continuation expects, so the downcast at the boundary
//! is an internal invariant, not a runtime question.
//!
//! Cloneability is what keeps task values re-runnable: a `Pure` node must
//! be able to hand out its value once per run.
//!
//! [`Task`]: crate::task::Task

use std::any::Any;

pub(crate) trait AnyValue: Any + Send + Sync {
    fn clone_boxed(&self) -> Boxed;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

pub(crate) type Boxed = Box<dyn AnyValue>;

impl<T: Any + Clone + Send + Sync> AnyValue for T {
    fn clone_boxed(&self) -> Boxed {
        Box::new(self.clone())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Clone for Boxed {
    fn clone(&self) -> Self {
        (**self).clone_boxed()
    }
}

pub(crate) fn boxed<A>(value: A) -> Boxed
where
    A: Any + Clone + Send + Sync,
{
    Box::new(value)
}

pub(crate) fn unbox<A: Any>(value: Boxed) -> A {
    match value.into_any().downcast::<A>() {
        Ok(typed) => *typed,
        Err(_) => unreachable!("erased task value did not match its phantom type"),
    }
}
