//! Tree shape and empty-leaf configuration.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::Zero;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::TreeError;
use crate::field::{bytes_to_field, parse_field, to_decimal};

/// Deepest tree supported (2^32 leaves).
pub const MAX_TREE_HEIGHT: usize = 32;

/// Height used by the deployed notary registry.
pub const DEFAULT_TREE_HEIGHT: usize = 12;

/// Prefix selecting a domain-separated zero in textual form.
const DOMAIN_PREFIX: &str = "keccak256:";

/// Value of an empty leaf.
///
/// Textual form is either a field element (`0`, `0x1f`, ...) or
/// `keccak256:<domain>`, which resolves to `keccak256(domain) mod p`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ZeroValue {
    Literal(Fr),
    Domain(String),
}

impl ZeroValue {
    /// The field element used for empty leaves.
    pub fn resolve(&self) -> Fr {
        match self {
            ZeroValue::Literal(value) => *value,
            ZeroValue::Domain(domain) => bytes_to_field(&Keccak256::digest(domain.as_bytes())),
        }
    }
}

impl Default for ZeroValue {
    fn default() -> Self {
        ZeroValue::Literal(Fr::zero())
    }
}

impl FromStr for ZeroValue {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(DOMAIN_PREFIX) {
            Some(domain) => Ok(ZeroValue::Domain(domain.to_string())),
            None => parse_field(s).map(ZeroValue::Literal),
        }
    }
}

impl TryFrom<String> for ZeroValue {
    type Error = TreeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ZeroValue> for String {
    fn from(value: ZeroValue) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ZeroValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroValue::Literal(value) => write!(f, "{}", to_decimal(value)),
            ZeroValue::Domain(domain) => write!(f, "{}{}", DOMAIN_PREFIX, domain),
        }
    }
}

/// Shape of a Merkle tree, validated before any tree is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub height: usize,
    pub zero: ZeroValue,
}

impl TreeConfig {
    pub fn new(height: usize) -> Self {
        Self {
            height,
            zero: ZeroValue::default(),
        }
    }

    pub fn with_zero(mut self, zero: ZeroValue) -> Self {
        self.zero = zero;
        self
    }

    /// Reject heights the contract could not hold.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.height == 0 || self.height > MAX_TREE_HEIGHT {
            return Err(TreeError::InvalidHeight {
                height: self.height,
                max: MAX_TREE_HEIGHT,
            });
        }
        Ok(())
    }

    /// Number of leaves the tree can hold.
    pub fn capacity(&self) -> u64 {
        1u64 << self.height
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TREE_HEIGHT)
    }
}
