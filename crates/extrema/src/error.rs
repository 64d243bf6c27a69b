use thiserror::Error;

use crate::distance::solution::SupportKind;

/// Misuse of the spatial partition index. Checked before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpatialIndexError {
    #[error("index is not initialized")]
    NotInitialized,
    #[error("box index {index} is out of range (capacity {capacity})")]
    OutOfRange { index: usize, capacity: usize },
    #[error("box index {index} is already bound")]
    AlreadyBound { index: usize },
}

/// Failure to decompose a shape into vertex/edge/face maps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExploreError {
    #[error("shape refers to a {kind} that is no longer in the store")]
    StaleKey { kind: &'static str },
}

/// Misuse of the shape-pair distance query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceError {
    #[error("distance query has not completed")]
    NotDone,
    #[error("solution index {index} is out of range ({count} solutions)")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("solution {index} is supported by a {actual:?}, not a {expected:?}")]
    IncompatibleSupport {
        index: usize,
        expected: SupportKind,
        actual: SupportKind,
    },
    #[error("shape decomposition failed: {0}")]
    Decomposition(#[from] ExploreError),
    #[error("spatial index misuse: {0}")]
    Index(#[from] SpatialIndexError),
    #[error("shape {which} has no vertices, edges or faces")]
    EmptyShape { which: u8 },
}
