//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Tree errors represent violations of the ordered-tree contract.
/// These are independent of fetching and caching concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Rotation requested between nodes that are not parent and child.
    /// Only reachable through a bug in the rebalancing code.
    #[error("invalid rotation: {child} is not a child of {parent}")]
    InvalidRotation { child: String, parent: String },

    #[error("red-black invariant violated: {0}")]
    InvariantViolation(String),
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
