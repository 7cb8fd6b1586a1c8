//! Errors raised by tree construction and proof generation.

use thiserror::Error;

/// Errors that can occur while building or querying a tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Merkle tree is full. No more leaves can be added (capacity {capacity})")]
    CapacityExceeded { capacity: u64 },
    #[error("Leaf not found in tree: {0}")]
    LeafNotFound(String),
    #[error("Index {index} out of bounds for tree with {len} leaves")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Invalid tree height {height}: must be between 1 and {max}")]
    InvalidHeight { height: usize, max: usize },
    #[error("Hash failed: {0}")]
    Hash(String),
    #[error("Invalid field element: {0}")]
    InvalidFieldElement(String),
}
