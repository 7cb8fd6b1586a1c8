//! Poseidon hash function for BN254.
//!
//! This module provides the circom-compatible Poseidon permutation used by the
//! notary circuits and contracts, plus the `FieldHasher` seam the trees are
//! generic over.

mod hasher;
mod native;


pub use hasher::{CircomPoseidon, FieldHasher};
pub use native::{poseidon_hash, poseidon_hash_many, poseidon_hash_two, MAX_POSEIDON_INPUTS};
