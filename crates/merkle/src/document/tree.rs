//! Document tree native implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ark_bn254::Fr;
use ark_std::rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TreeError;
use crate::field::{bytes_to_field, random_field};
use crate::poseidon::FieldHasher;
use crate::tree::{IncrementalMerkleTree, MerkleProof, MultiProof, TreeConfig};

/// Default document tree height (8 fields).
pub const DEFAULT_DOCUMENT_HEIGHT: usize = 3;

/// A document field value.
///
/// Numbers are encoded big-endian, `0x` text as the bytes it spells and any
/// other text as UTF-8. The bytes are then reduced into the field; there is
/// no failure case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(u64),
    Text(String),
}

impl FieldValue {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            FieldValue::Number(n) => n.to_be_bytes().to_vec(),
            FieldValue::Text(text) => match text.strip_prefix("0x") {
                Some(digits) => {
                    let padded = if digits.len() % 2 == 1 {
                        format!("0{}", digits)
                    } else {
                        digits.to_string()
                    };
                    hex::decode(padded).unwrap_or_else(|_| text.as_bytes().to_vec())
                }
                None => text.as_bytes().to_vec(),
            },
        }
    }

    pub fn to_field(&self) -> Fr {
        bytes_to_field(&self.to_bytes())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Field element for a document key: `sha256(key) mod p`.
pub fn key_to_field(key: &str) -> Fr {
    bytes_to_field(&Sha256::digest(key.as_bytes()))
}

/// One salted document field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentLeaf {
    pub key: String,
    pub value: FieldValue,
    pub key_field: Fr,
    pub value_field: Fr,
    pub salt: Fr,
    pub hash: Fr,
}

impl DocumentLeaf {
    fn new(
        hasher: &dyn FieldHasher,
        key: String,
        value: FieldValue,
        salt: Fr,
    ) -> Result<Self, TreeError> {
        let key_field = key_to_field(&key);
        let value_field = value.to_field();
        let hash = hasher.hash(&[key_field, value_field, salt])?;

        Ok(Self {
            key,
            value,
            key_field,
            value_field,
            salt,
            hash,
        })
    }

    /// `[key, value, salt]` as disclosed to an aggregate circuit.
    pub fn fields(&self) -> [Fr; 3] {
        [self.key_field, self.value_field, self.salt]
    }
}

/// Merkle tree over the salted fields of one document.
#[derive(Clone, Debug)]
pub struct DocumentTree {
    tree: IncrementalMerkleTree,
    /// Sorted by key; position equals tree leaf index
    leaves: Vec<DocumentLeaf>,
}

impl DocumentTree {
    /// Build a tree with a fresh random salt for every field.
    pub fn build<R: Rng + ?Sized>(
        document: &BTreeMap<String, FieldValue>,
        hasher: Arc<dyn FieldHasher>,
        height: usize,
        rng: &mut R,
    ) -> Result<Self, TreeError> {
        let salted = document
            .iter()
            .map(|(key, value)| (key.clone(), value.clone(), random_field(rng)))
            .collect::<Vec<_>>();
        Self::from_salted(salted, hasher, height)
    }

    /// Build a tree from fields whose salts are already known.
    ///
    /// Entries are sorted by key; a repeated key keeps its last value.
    pub fn from_salted<I>(entries: I, hasher: Arc<dyn FieldHasher>, height: usize) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (String, FieldValue, Fr)>,
    {
        let sorted: BTreeMap<String, (FieldValue, Fr)> = entries
            .into_iter()
            .map(|(key, value, salt)| (key, (value, salt)))
            .collect();

        let leaves = sorted
            .into_iter()
            .map(|(key, (value, salt))| DocumentLeaf::new(hasher.as_ref(), key, value, salt))
            .collect::<Result<Vec<_>, _>>()?;

        let hashes: Vec<Fr> = leaves.iter().map(|leaf| leaf.hash).collect();
        let tree = IncrementalMerkleTree::with_leaves(&TreeConfig::new(height), hasher, &hashes)?;

        Ok(Self { tree, leaves })
    }

    pub fn root(&self) -> Fr {
        self.tree.root()
    }

    pub fn height(&self) -> usize {
        self.tree.height()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaves(&self) -> &[DocumentLeaf] {
        &self.leaves
    }

    pub fn tree(&self) -> &IncrementalMerkleTree {
        &self.tree
    }

    pub fn find_leaf(&self, key: &str) -> Option<&DocumentLeaf> {
        self.leaf_index(key).ok().map(|i| &self.leaves[i])
    }

    pub fn leaf_index(&self, key: &str) -> Result<usize, TreeError> {
        self.leaves
            .binary_search_by(|leaf| leaf.key.as_str().cmp(key))
            .map_err(|_| TreeError::LeafNotFound(key.to_string()))
    }

    /// Inclusion proof for one field.
    pub fn proof(&self, key: &str) -> Result<MerkleProof, TreeError> {
        self.tree.path(self.leaf_index(key)?)
    }

    /// Batch proof for several fields. Keys are sorted and deduplicated first,
    /// so the proof lines up with `leaf_hashes` for the same keys.
    pub fn multi_proof<S: AsRef<str>>(&self, keys: &[S]) -> Result<MultiProof, TreeError> {
        let indices = sorted_keys(keys)
            .iter()
            .map(|key| self.leaf_index(key))
            .collect::<Result<Vec<_>, _>>()?;
        self.tree.multi_proof_for_indices(&indices)
    }

    /// Leaf hashes for `keys`, in sorted and deduplicated key order.
    pub fn leaf_hashes<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<Fr>, TreeError> {
        self.disclosed(keys)
            .map(|leaves| leaves.iter().map(|leaf| leaf.hash).collect())
    }

    /// Leaves for `keys`, in sorted and deduplicated key order.
    pub fn disclosed<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<&DocumentLeaf>, TreeError> {
        sorted_keys(keys)
            .iter()
            .map(|key| self.leaf_index(key).map(|i| &self.leaves[i]))
            .collect()
    }
}

fn sorted_keys<S: AsRef<str>>(keys: &[S]) -> Vec<&str> {
    let unique: BTreeSet<&str> = keys.iter().map(|key| key.as_ref()).collect();
    unique.into_iter().collect()
}
