//! Batch inclusion proofs.
//!
//! A multi-proof carries only the siblings a batch of leaves cannot derive on
//! its own. Both generation and verification visit levels from the leaves up
//! and, within a level, node indices in ascending order; the path elements
//! are therefore consumed in exactly the order they were emitted.

use std::collections::BTreeMap;

use ark_bn254::Fr;
use ark_ff::Zero;
use serde::{Deserialize, Serialize};

use super::config::MAX_TREE_HEIGHT;
use crate::error::TreeError;
use crate::field::serde_fr_vec;
use crate::poseidon::FieldHasher;

/// Deduplicated sibling set plus the explicit indices of the proven leaves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiProof {
    #[serde(with = "serde_fr_vec")]
    pub path_elements: Vec<Fr>,
    pub leaf_indices: Vec<usize>,
}

/// Multi-proof laid out for a fixed-size circuit: every vector is padded with
/// zeros up to `2^height` entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaddedMultiProof {
    #[serde(with = "serde_fr_vec")]
    pub leaves: Vec<Fr>,
    #[serde(with = "serde_fr_vec")]
    pub path_elements: Vec<Fr>,
    pub leaf_indices: Vec<u64>,
}

impl MultiProof {
    /// Check that `leaves` (in `leaf_indices` order) reproduce `root`.
    pub fn verify(&self, hasher: &dyn FieldHasher, height: usize, root: Fr, leaves: &[Fr]) -> bool {
        verify_multi_proof(hasher, height, root, leaves, self)
    }

    /// Pad leaves, path elements and indices to the circuit's `2^height` slots.
    pub fn padded(&self, leaves: &[Fr], height: usize) -> Result<PaddedMultiProof, TreeError> {
        if height == 0 || height > MAX_TREE_HEIGHT {
            return Err(TreeError::InvalidHeight {
                height,
                max: MAX_TREE_HEIGHT,
            });
        }
        let slots = 1usize << height;
        if leaves.len() > slots || self.path_elements.len() > slots {
            return Err(TreeError::CapacityExceeded {
                capacity: slots as u64,
            });
        }

        let mut padded_leaves = leaves.to_vec();
        padded_leaves.resize(slots, Fr::zero());
        let mut path_elements = self.path_elements.clone();
        path_elements.resize(slots, Fr::zero());
        let mut leaf_indices: Vec<u64> = self.leaf_indices.iter().map(|&i| i as u64).collect();
        leaf_indices.resize(slots, 0);

        Ok(PaddedMultiProof {
            leaves: padded_leaves,
            path_elements,
            leaf_indices,
        })
    }
}

/// Recompute the root from a batch of leaves and a multi-proof.
///
/// Fails (returns false) on a length mismatch, an index outside the tree, two
/// different values claimed for one index, a missing or unused path element,
/// or a root mismatch.
pub fn verify_multi_proof(
    hasher: &dyn FieldHasher,
    height: usize,
    root: Fr,
    leaves: &[Fr],
    proof: &MultiProof,
) -> bool {
    if leaves.is_empty() || leaves.len() != proof.leaf_indices.len() || height > MAX_TREE_HEIGHT {
        return false;
    }

    let mut known: BTreeMap<usize, Fr> = BTreeMap::new();
    for (&index, &leaf) in proof.leaf_indices.iter().zip(leaves) {
        if index as u64 >= 1u64 << height {
            return false;
        }
        if let Some(previous) = known.insert(index, leaf) {
            if previous != leaf {
                return false;
            }
        }
    }

    let mut siblings = proof.path_elements.iter();
    for _ in 0..height {
        let mut parents = BTreeMap::new();
        for (&index, &value) in &known {
            let is_right = index % 2 == 1;
            if is_right && known.contains_key(&(index - 1)) {
                continue;
            }

            let (left, right) = if is_right {
                match siblings.next() {
                    Some(&left) => (left, value),
                    None => return false,
                }
            } else {
                match known.get(&(index + 1)).or_else(|| siblings.next()) {
                    Some(&right) => (value, right),
                    None => return false,
                }
            };

            match hasher.hash2(left, right) {
                Ok(parent) => {
                    parents.insert(index / 2, parent);
                }
                Err(_) => return false,
            }
        }
        known = parents;
    }

    siblings.next().is_none() && known.len() == 1 && known.get(&0) == Some(&root)
}
