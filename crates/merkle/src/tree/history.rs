//! Incremental tree plus the contract's ring buffer of recent roots.

use std::sync::Arc;

use ark_bn254::Fr;
use ark_ff::Zero;

use super::config::TreeConfig;
use super::tree::IncrementalMerkleTree;
use crate::error::TreeError;
use crate::poseidon::FieldHasher;

/// Number of recent roots accepted for proofs.
pub const ROOT_HISTORY_SIZE: usize = 30;

/// Merkle tree that remembers its last `ROOT_HISTORY_SIZE` roots, so proofs
/// built against a slightly stale root still verify.
#[derive(Clone, Debug)]
pub struct MerkleTreeWithHistory {
    tree: IncrementalMerkleTree,
    roots: Vec<Fr>,
    current_root_index: usize,
}

impl MerkleTreeWithHistory {
    pub fn new(config: &TreeConfig, hasher: Arc<dyn FieldHasher>) -> Result<Self, TreeError> {
        let tree = IncrementalMerkleTree::new(config, hasher)?;
        let mut roots = vec![Fr::zero(); ROOT_HISTORY_SIZE];
        roots[0] = tree.root();

        Ok(Self {
            tree,
            roots,
            current_root_index: 0,
        })
    }

    /// Append a leaf, record the new root and return the leaf index.
    pub fn insert(&mut self, leaf: Fr) -> Result<usize, TreeError> {
        let index = self.tree.insert(leaf)?;
        self.current_root_index = (self.current_root_index + 1) % ROOT_HISTORY_SIZE;
        self.roots[self.current_root_index] = self.tree.root();
        Ok(index)
    }

    /// Whether `root` is one of the recorded recent roots. Zero never is.
    pub fn is_known_root(&self, root: &Fr) -> bool {
        if root.is_zero() {
            return false;
        }

        (0..ROOT_HISTORY_SIZE)
            .map(|back| (self.current_root_index + ROOT_HISTORY_SIZE - back) % ROOT_HISTORY_SIZE)
            .any(|i| self.roots[i] == *root)
    }

    pub fn last_root(&self) -> Fr {
        self.roots[self.current_root_index]
    }

    /// Index the next inserted leaf will get.
    pub fn next_index(&self) -> usize {
        self.tree.len()
    }

    pub fn tree(&self) -> &IncrementalMerkleTree {
        &self.tree
    }
}
