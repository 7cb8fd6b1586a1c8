//! Append-only incremental Merkle tree mirroring the notary contract.
//!
//! This module provides:
//! - `IncrementalMerkleTree`: fixed-height tree with the contract's
//!   filled-subtree insert algorithm
//! - `MerkleProof`: single-leaf inclusion proof with circuit index packing
//! - `MultiProof`: deduplicated batch inclusion proof
//! - `MerkleTreeWithHistory`: tree plus the contract's recent-root ring buffer

mod config;
mod history;
mod multiproof;
mod proof;
mod tree;


pub use config::{TreeConfig, ZeroValue, DEFAULT_TREE_HEIGHT, MAX_TREE_HEIGHT};
pub use history::{MerkleTreeWithHistory, ROOT_HISTORY_SIZE};
pub use multiproof::{verify_multi_proof, MultiProof, PaddedMultiProof};
pub use proof::{pack_path_indices, MerkleProof};
pub use tree::{compute_root, zero_hashes, IncrementalMerkleTree};
