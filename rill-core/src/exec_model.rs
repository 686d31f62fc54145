// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Frame-budget arithmetic for the trampoline.
//!
//! The interpreter asks its execution model for the next frame index after
//! every successful reduction. An answer of `0` is the signal to stop
//! reducing synchronously and reschedule on the scheduler; the model
//! guarantees a nonzero answer for index `0` so a freshly (re)started run
//! always makes progress before yielding.

/// Default number of synchronous reductions between forced yields.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// How a run span trades latency against fairness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionModel {
    /// Reduce in batches, yielding to the scheduler once per batch.
    ///
    /// The batch size is rounded up to a power of two so the frame counter
    /// can wrap with a mask.
    Batched { batch_size: usize },
    /// Yield after every reduction.
    AlwaysAsync,
    /// Never force a yield; only explicit `Async` nodes leave the thread.
    Synchronous,
}

impl ExecutionModel {
    pub fn batched(batch_size: usize) -> Self {
        ExecutionModel::Batched {
            batch_size: batch_size.max(2),
        }
    }

    /// Next frame index after a reduction at `current`.
    ///
    /// Returns `0` when the caller must yield; `next_frame_index(0)` is
    /// always nonzero.
    pub fn next_frame_index(&self, current: usize) -> usize {
        match self {
            ExecutionModel::Batched { batch_size } => {
                let mask = batch_size.next_power_of_two() - 1;
                current.wrapping_add(1) & mask
            }
            ExecutionModel::AlwaysAsync => {
                if current == 0 {
                    1
                } else {
                    0
                }
            }
            ExecutionModel::Synchronous => 1,
        }
    }

    /// Batch size hint for consumers that drain element buffers.
    pub fn recommended_batch_size(&self) -> usize {
        match self {
            ExecutionModel::Batched { batch_size } => batch_size.next_power_of_two(),
            ExecutionModel::AlwaysAsync => 1,
            ExecutionModel::Synchronous => DEFAULT_BATCH_SIZE,
        }
    }
}

impl Default for ExecutionModel {
    fn default() -> Self {
        ExecutionModel::Batched {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batched_yields_once_per_batch() {
        let model = ExecutionModel::batched(8);
        let mut index = model.next_frame_index(0);
        assert_ne!(index, 0);
        let mut steps = 1;
        while index != 0 {
            index = model.next_frame_index(index);
            steps += 1;
        }
        assert_eq!(steps, 8);
    }

    #[test]
    fn always_async_starts_nonzero_then_yields() {
        let model = ExecutionModel::AlwaysAsync;
        let first = model.next_frame_index(0);
        assert_ne!(first, 0);
        assert_eq!(model.next_frame_index(first), 0);
    }

    #[test]
    fn synchronous_never_yields() {
        let model = ExecutionModel::Synchronous;
        let mut index = model.next_frame_index(0);
        for _ in 0..10_000 {
            index = model.next_frame_index(index);
            assert_ne!(index, 0);
        }
    }
}
