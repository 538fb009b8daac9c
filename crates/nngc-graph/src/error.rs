//! Error types for graph construction.

use crate::types::Shape;

/// Errors that can occur when building or validating a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A node references a handle that is not in the arena.
    #[error("node input handle [{index}] not in arena (size: {size})")]
    BadHandle { index: usize, size: usize },

    /// Two shapes cannot be broadcast together.
    #[error("shapes {lhs} and {rhs} do not broadcast")]
    BroadcastMismatch { lhs: Shape, rhs: Shape },

    /// A tensor does not have the rank an operation requires.
    #[error("expected rank {expected}, found shape {found}")]
    RankMismatch { expected: usize, found: Shape },

    /// An axis is out of range for a tensor's rank.
    #[error("axis {axis} out of range for rank {rank}")]
    AxisOutOfRange { axis: i32, rank: usize },

    /// A node that must have inputs was given the wrong number.
    #[error("{kind} expects {expected} inputs, got {got}")]
    ArityMismatch {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    /// A result or parameter handle does not name an arena node.
    #[error("graph {list} list references handle [{index}] outside the arena")]
    BadListEntry { list: &'static str, index: usize },
}
