//! Single-leaf Merkle inclusion proof.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::field::{serde_fr, serde_fr_vec};
use crate::poseidon::FieldHasher;

/// Pack direction bits (leaf level first) into the integer circuits expect.
///
/// The bit sequence is reversed and read as a binary number, which puts the
/// leaf-level bit in the least significant position.
pub fn pack_path_indices(bits: &[bool]) -> u64 {
    bits.iter()
        .rev()
        .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit))
}

/// A Merkle proof for one leaf of an incremental tree.
///
/// Contains the sibling hashes from leaf to root and direction indices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    #[serde(with = "serde_fr")]
    pub leaf: Fr,

    pub leaf_index: usize,

    /// Root the proof was generated against
    #[serde(with = "serde_fr")]
    pub root: Fr,

    /// Sibling hashes from leaf level (0) to the level below the root
    #[serde(with = "serde_fr_vec")]
    pub path_elements: Vec<Fr>,

    /// Direction at each level: true = current node is right child
    pub path_indices: Vec<bool>,
}

impl MerkleProof {
    pub fn depth(&self) -> usize {
        self.path_elements.len()
    }

    /// Direction bits packed for a circuit `pathIndices` input.
    pub fn packed_indices(&self) -> u64 {
        pack_path_indices(&self.path_indices)
    }

    /// Fold the leaf up the path.
    pub fn compute_root(&self, hasher: &dyn FieldHasher) -> Result<Fr, TreeError> {
        let mut current = self.leaf;

        for (sibling, &is_right) in self.path_elements.iter().zip(self.path_indices.iter()) {
            current = if is_right {
                hasher.hash2(*sibling, current)?
            } else {
                hasher.hash2(current, *sibling)?
            };
        }

        Ok(current)
    }

    /// Check that the path reproduces the recorded root.
    pub fn verify(&self, hasher: &dyn FieldHasher) -> bool {
        if self.path_elements.len() != self.path_indices.len() {
            return false;
        }
        matches!(self.compute_root(hasher), Ok(root) if root == self.root)
    }
}
