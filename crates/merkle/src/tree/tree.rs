//! Incremental Merkle tree native implementation.
//!
//! Leaves are appended left to right and never change. Each insert walks the
//! path to the root once, caching the most recent left child per level in
//! `filled_subtrees` exactly as the on-chain `MerkleTreeWithHistory` does, so
//! the off-chain root tracks the contract root bit for bit.
//!
//! Every node produced along an insert path is also kept in `layers`, which
//! is what lets the tree answer path and batch proof queries.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use ark_bn254::Fr;
use rayon::prelude::*;
use tracing::debug;

use super::config::TreeConfig;
use super::multiproof::MultiProof;
use super::proof::MerkleProof;
use crate::error::TreeError;
use crate::field::to_decimal;
use crate::poseidon::FieldHasher;

/// Empty-subtree hashes: `zeros[0]` is the empty leaf and
/// `zeros[i] = hash2(zeros[i-1], zeros[i-1])`, up to and including `height`.
pub fn zero_hashes(hasher: &dyn FieldHasher, zero: Fr, height: usize) -> Result<Vec<Fr>, TreeError> {
    let mut zeros = Vec::with_capacity(height + 1);
    zeros.push(zero);
    for level in 0..height {
        let prev = zeros[level];
        zeros.push(hasher.hash2(prev, prev)?);
    }
    Ok(zeros)
}

/// Root of a tree holding `leaves`, computed level by level from scratch.
///
/// This is the reference the incremental algorithm must agree with.
pub fn compute_root(
    hasher: &dyn FieldHasher,
    config: &TreeConfig,
    leaves: &[Fr],
) -> Result<Fr, TreeError> {
    config.validate()?;
    if leaves.len() as u64 > config.capacity() {
        return Err(TreeError::CapacityExceeded {
            capacity: config.capacity(),
        });
    }

    let zeros = zero_hashes(hasher, config.zero.resolve(), config.height)?;
    let mut layer = leaves.to_vec();

    for zero in zeros.iter().take(config.height) {
        if layer.len() % 2 == 1 {
            layer.push(*zero);
        }
        layer = layer
            .par_chunks(2)
            .map(|pair| hasher.hash2(pair[0], pair[1]))
            .collect::<Result<Vec<_>, _>>()?;
    }

    Ok(layer.first().copied().unwrap_or(zeros[config.height]))
}

/// Append-only Merkle tree with the contract's insert semantics.
#[derive(Clone)]
pub struct IncrementalMerkleTree {
    /// Number of levels between the leaves and the root
    height: usize,

    hasher: Arc<dyn FieldHasher>,

    /// Empty-subtree hash per level, `height + 1` entries
    zeros: Vec<Fr>,

    /// Latest left child seen at each level, as stored on-chain
    filled_subtrees: Vec<Fr>,

    /// Materialised nodes: `layers[0]` holds the leaves, `layers[height]` the root
    layers: Vec<Vec<Fr>>,

    root: Fr,
}

impl IncrementalMerkleTree {
    /// Create an empty tree. Its root is `zeros[height]`.
    pub fn new(config: &TreeConfig, hasher: Arc<dyn FieldHasher>) -> Result<Self, TreeError> {
        config.validate()?;
        let zeros = zero_hashes(hasher.as_ref(), config.zero.resolve(), config.height)?;

        Ok(Self {
            height: config.height,
            filled_subtrees: zeros[..config.height].to_vec(),
            layers: vec![Vec::new(); config.height + 1],
            root: zeros[config.height],
            zeros,
            hasher,
        })
    }

    /// Create a tree pre-populated with `leaves`, in order.
    pub fn with_leaves(
        config: &TreeConfig,
        hasher: Arc<dyn FieldHasher>,
        leaves: &[Fr],
    ) -> Result<Self, TreeError> {
        let mut tree = Self::new(config, hasher)?;
        tree.bulk_insert(leaves)?;
        Ok(tree)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    /// Maximum number of leaves, `2^height`.
    pub fn capacity(&self) -> u64 {
        1u64 << self.height
    }

    pub fn root(&self) -> Fr {
        self.root
    }

    pub fn leaves(&self) -> &[Fr] {
        &self.layers[0]
    }

    pub fn zeros(&self) -> &[Fr] {
        &self.zeros
    }

    pub fn zero_element(&self) -> Fr {
        self.zeros[0]
    }

    pub fn filled_subtrees(&self) -> &[Fr] {
        &self.filled_subtrees
    }

    pub fn hasher(&self) -> &Arc<dyn FieldHasher> {
        &self.hasher
    }

    /// Position of the first leaf equal to `leaf`.
    pub fn index_of(&self, leaf: &Fr) -> Option<usize> {
        self.layers[0].iter().position(|l| l == leaf)
    }

    /// Node value at `(level, index)`, falling back to the empty subtree hash.
    pub fn node(&self, level: usize, index: usize) -> Fr {
        self.layers[level]
            .get(index)
            .copied()
            .unwrap_or(self.zeros[level])
    }

    /// Append a leaf and return its index.
    ///
    /// The new path is computed in full before anything is written, so a
    /// failed insert leaves the tree untouched.
    pub fn insert(&mut self, leaf: Fr) -> Result<usize, TreeError> {
        let index = self.len();
        if index as u64 >= self.capacity() {
            return Err(TreeError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }

        let mut filled = self.filled_subtrees.clone();
        let mut path_nodes = Vec::with_capacity(self.height);
        let mut current = leaf;
        let mut node_index = index;

        for level in 0..self.height {
            current = if node_index % 2 == 0 {
                filled[level] = current;
                self.hasher.hash2(current, self.zeros[level])?
            } else {
                self.hasher.hash2(filled[level], current)?
            };
            node_index /= 2;
            path_nodes.push(current);
        }

        self.layers[0].push(leaf);
        let mut node_index = index;
        for (level, node) in path_nodes.into_iter().enumerate() {
            node_index /= 2;
            let layer = &mut self.layers[level + 1];
            if node_index < layer.len() {
                layer[node_index] = node;
            } else {
                layer.push(node);
            }
        }
        self.filled_subtrees = filled;
        self.root = current;

        Ok(index)
    }

    /// Append several leaves in order. Either all are inserted or none.
    pub fn bulk_insert(&mut self, leaves: &[Fr]) -> Result<(), TreeError> {
        if (self.len() + leaves.len()) as u64 > self.capacity() {
            return Err(TreeError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }

        let mut next = self.clone();
        for leaf in leaves {
            next.insert(*leaf)?;
        }
        *self = next;

        debug!(inserted = leaves.len(), total = self.len(), "bulk insert");
        Ok(())
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn path(&self, index: usize) -> Result<MerkleProof, TreeError> {
        if index >= self.len() {
            return Err(TreeError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }

        let mut path_elements = Vec::with_capacity(self.height);
        let mut path_indices = Vec::with_capacity(self.height);
        let mut node_index = index;

        for level in 0..self.height {
            path_elements.push(self.node(level, node_index ^ 1));
            path_indices.push(node_index % 2 == 1);
            node_index /= 2;
        }

        Ok(MerkleProof {
            leaf: self.layers[0][index],
            leaf_index: index,
            root: self.root,
            path_elements,
            path_indices,
        })
    }

    /// Inclusion proof for a leaf value (first occurrence).
    pub fn proof(&self, leaf: &Fr) -> Result<MerkleProof, TreeError> {
        let index = self
            .index_of(leaf)
            .ok_or_else(|| TreeError::LeafNotFound(to_decimal(leaf)))?;
        self.path(index)
    }

    /// Batch inclusion proof for several leaf values.
    pub fn multi_proof(&self, leaves: &[Fr]) -> Result<MultiProof, TreeError> {
        let indices = leaves
            .iter()
            .map(|leaf| {
                self.index_of(leaf)
                    .ok_or_else(|| TreeError::LeafNotFound(to_decimal(leaf)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.multi_proof_for_indices(&indices)
    }

    /// Batch inclusion proof addressed by leaf index.
    ///
    /// Levels are walked from the leaves up. At each level the known node
    /// indices are visited in ascending order and a sibling is emitted only
    /// when the batch cannot derive it itself. Leaf indices are returned in
    /// the caller's order.
    pub fn multi_proof_for_indices(&self, indices: &[usize]) -> Result<MultiProof, TreeError> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(TreeError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }

        let mut known: BTreeSet<usize> = indices.iter().copied().collect();
        let mut path_elements = Vec::new();

        for level in 0..self.height {
            let mut parents = BTreeSet::new();
            for &index in &known {
                let sibling = index ^ 1;
                if !known.contains(&sibling) {
                    path_elements.push(self.node(level, sibling));
                }
                parents.insert(index / 2);
            }
            known = parents;
        }

        Ok(MultiProof {
            path_elements,
            leaf_indices: indices.to_vec(),
        })
    }
}

impl fmt::Debug for IncrementalMerkleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncrementalMerkleTree")
            .field("height", &self.height)
            .field("len", &self.len())
            .field("root", &to_decimal(&self.root))
            .finish()
    }
}
