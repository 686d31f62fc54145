// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The task node tree.
//!
//! Nodes are descriptions; the only code that gives them meaning is the
//! run loop. Everything is behind `Arc` so a task can be cloned cheaply and
//! run any number of times.

use std::sync::Arc;

use crate::callback::RestartCallback;
use crate::context::Context;
use crate::erased::Boxed;
use crate::frame::{Frame, MapFn};
use crate::memo::MemoCell;
use rill_error::RillError;

pub(crate) type ValueThunk = Arc<dyn Fn() -> Result<Boxed, RillError> + Send + Sync>;
pub(crate) type NodeThunk = Arc<dyn Fn() -> Node + Send + Sync>;
pub(crate) type RegisterFn = Arc<dyn Fn(&Context, Arc<RestartCallback>) + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Node {
    /// Already-computed value.
    Pure(Boxed),
    /// Synchronous, possibly side-effectful producer.
    Delay(ValueThunk),
    /// Lazily produces the next subtree.
    Suspend(NodeThunk),
    /// Monadic continuation or error handler over `source`.
    Bind { source: Tail, frame: Frame },
    /// Value transformation over `source`.
    Mapped {
        source: Tail,
        f: MapFn,
        guarded: bool,
    },
    /// Non-fatal failure.
    Fail(RillError),
    /// Escape hatch to external asynchrony.
    Async { register: RegisterFn },
    /// Shared at-most-once producer.
    Memoized(Arc<MemoCell>),
}

/// Owning pointer to a `Bind`/`Mapped` source.
///
/// Programs assembled in a loop (`for _ in 0..n { t = t.flat_map(..) }`)
/// nest these `n` deep. Compiler-generated clone and drop glue would
/// recurse once per level and overflow the stack long before the run loop
/// ever sees the tree, so both walk the spine iteratively here.
pub(crate) struct Tail(Option<Box<Node>>);

impl Tail {
    pub(crate) fn new(node: Node) -> Self {
        Tail(Some(Box::new(node)))
    }

    pub(crate) fn into_node(mut self) -> Node {
        match self.0.take() {
            Some(boxed) => *boxed,
            None => unreachable!("bind-chain tail already taken"),
        }
    }

    fn node_ref(&self) -> &Node {
        match &self.0 {
            Some(boxed) => boxed,
            None => unreachable!("bind-chain tail already taken"),
        }
    }
}

impl Clone for Tail {
    fn clone(&self) -> Self {
        enum Shell {
            Bind(Frame),
            Map(MapFn, bool),
        }
        let mut shells = Vec::new();
        let mut cursor = self.node_ref();
        let leaf = loop {
            match cursor {
                Node::Bind { source, frame } => {
                    shells.push(Shell::Bind(frame.clone()));
                    cursor = source.node_ref();
                }
                Node::Mapped { source, f, guarded } => {
                    shells.push(Shell::Map(f.clone(), *guarded));
                    cursor = source.node_ref();
                }
                other => break shallow_clone(other),
            }
        };
        let mut node = leaf;
        for shell in shells.into_iter().rev() {
            node = match shell {
                Shell::Bind(frame) => Node::Bind {
                    source: Tail::new(node),
                    frame,
                },
                Shell::Map(f, guarded) => Node::Mapped {
                    source: Tail::new(node),
                    f,
                    guarded,
                },
            };
        }
        Tail::new(node)
    }
}

fn shallow_clone(node: &Node) -> Node {
    match node {
        Node::Pure(value) => Node::Pure(value.clone()),
        Node::Delay(thunk) => Node::Delay(thunk.clone()),
        Node::Suspend(thunk) => Node::Suspend(thunk.clone()),
        Node::Fail(error) => Node::Fail(error.clone()),
        Node::Async { register } => Node::Async {
            register: register.clone(),
        },
        Node::Memoized(cell) => Node::Memoized(cell.clone()),
        Node::Bind { .. } | Node::Mapped { .. } => {
            unreachable!("spine variants are handled by the walk")
        }
    }
}

impl Drop for Tail {
    fn drop(&mut self) {
        let Some(first) = self.0.take() else { return };
        let mut pending = vec![first];
        while let Some(mut boxed) = pending.pop() {
            match &mut *boxed {
                Node::Bind { source, .. } | Node::Mapped { source, .. } => {
                    if let Some(child) = source.0.take() {
                        pending.push(child);
                    }
                }
                _ => {}
            }
        }
    }
}
