// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Bind-chain entries.
//!
//! The bind chain holds plain continuations, value mappings and error
//! handlers as one enum so the run loop can tell them apart while popping:
//! a success pops the next non-`Recover` frame, a failure discards
//! everything up to the next `Recover`.

use std::sync::Arc;

use crate::erased::Boxed;
use crate::node::Node;
use rill_error::RillError;

pub(crate) type BindFn = Arc<dyn Fn(Boxed) -> Node + Send + Sync>;
pub(crate) type MapFn = Arc<dyn Fn(Boxed) -> Boxed + Send + Sync>;
pub(crate) type RecoverFn = Arc<dyn Fn(RillError) -> Node + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Frame {
    /// Monadic continuation: value in, subtree out.
    Bind(BindFn),
    /// Value transformation. The flag records whether the function may
    /// fail and therefore needs the non-fatal guard.
    Map(MapFn, bool),
    /// Error handler; skipped by successful values.
    Recover(RecoverFn),
}
