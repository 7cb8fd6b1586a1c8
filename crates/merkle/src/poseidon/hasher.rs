//! The hash seam shared by every tree in the crate.

use ark_bn254::Fr;

use super::native::poseidon_hash_many;
use crate::error::TreeError;

/// A field hash usable as a Merkle node function.
///
/// Implementations must be pure: the same inputs always give the same output,
/// otherwise off-chain roots drift from the contract's.
pub trait FieldHasher: Send + Sync {
    /// Hash an arbitrary-arity list of field elements.
    fn hash(&self, inputs: &[Fr]) -> Result<Fr, TreeError>;

    /// Hash a left/right node pair.
    fn hash2(&self, left: Fr, right: Fr) -> Result<Fr, TreeError> {
        self.hash(&[left, right])
    }
}

/// Poseidon with circomlib parameters, the hash used on-chain.
#[derive(Clone, Copy, Debug, Default)]
pub struct CircomPoseidon;

impl FieldHasher for CircomPoseidon {
    fn hash(&self, inputs: &[Fr]) -> Result<Fr, TreeError> {
        poseidon_hash_many(inputs)
    }
}
