//! Poseidon Merkle trees for the private credential notary.
//!
//! This crate provides:
//! - A circom-compatible Poseidon adapter over the BN254 scalar field
//! - `IncrementalMerkleTree`: append-only tree matching the on-chain insert algorithm
//! - Single-leaf and batch (multi-leaf) membership proofs
//! - `MerkleTreeWithHistory`: the root ring buffer kept by the notary contract
//! - `DocumentTree`: salted key/value attribute tree for selective disclosure

pub mod document;
pub mod error;
pub mod field;
pub mod poseidon;
pub mod tree;

pub use document::{DocumentLeaf, DocumentTree, FieldValue, DEFAULT_DOCUMENT_HEIGHT};
pub use error::TreeError;
pub use field::{bytes_to_field, parse_field, random_field, to_decimal, to_fixed_hex};
pub use poseidon::{
    poseidon_hash, poseidon_hash_many, poseidon_hash_two, CircomPoseidon, FieldHasher,
};
pub use tree::{
    compute_root, verify_multi_proof, IncrementalMerkleTree, MerkleProof,
    MerkleTreeWithHistory, MultiProof, TreeConfig, ZeroValue, MAX_TREE_HEIGHT,
    ROOT_HISTORY_SIZE,
};

use ark_bn254::Fr;

/// Common field type for all operations
pub type ConstraintF = Fr;
