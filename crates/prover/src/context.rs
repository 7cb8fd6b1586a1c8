//! Cryptographic context shared by the credential and preparer layers.
//!
//! The hash and the EdDSA-Poseidon signature check are injected once here
//! and passed down by reference.

use std::sync::Arc;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use notary_merkle::field::serde_fr;
use notary_merkle::{CircomPoseidon, FieldHasher};

use crate::eddsa::EddsaPoseidon;
use crate::error::NotaryError;

/// Baby Jubjub public key (affine coordinates).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(with = "serde_fr")]
    pub x: Fr,
    #[serde(with = "serde_fr")]
    pub y: Fr,
}

/// EdDSA-Poseidon signature `(R8, S)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "serde_fr")]
    pub r8_x: Fr,
    #[serde(with = "serde_fr")]
    pub r8_y: Fr,
    #[serde(with = "serde_fr")]
    pub s: Fr,
}

/// Checks an EdDSA-Poseidon signature over a single field element.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, message: Fr, signature: &Signature, public_key: &PublicKey) -> bool;
}

/// Hash plus signature primitives used to derive and check credentials.
#[derive(Clone)]
pub struct CryptoContext {
    hasher: Arc<dyn FieldHasher>,
    signatures: Arc<dyn SignatureVerifier>,
}

impl CryptoContext {
    pub fn new(hasher: Arc<dyn FieldHasher>, signatures: Arc<dyn SignatureVerifier>) -> Self {
        Self { hasher, signatures }
    }

    /// Context with circom Poseidon as the hash.
    pub fn poseidon(signatures: Arc<dyn SignatureVerifier>) -> Self {
        Self::new(Arc::new(CircomPoseidon), signatures)
    }

    /// Circom Poseidon with EdDSA-Poseidon signatures on Baby Jubjub.
    pub fn circom() -> Self {
        Self::poseidon(Arc::new(EddsaPoseidon))
    }

    pub fn hasher(&self) -> &Arc<dyn FieldHasher> {
        &self.hasher
    }

    pub fn hash(&self, inputs: &[Fr]) -> Result<Fr, NotaryError> {
        Ok(self.hasher.hash(inputs)?)
    }

    pub fn hash2(&self, left: Fr, right: Fr) -> Result<Fr, NotaryError> {
        Ok(self.hasher.hash2(left, right)?)
    }

    pub fn verify_signature(&self, message: Fr, signature: &Signature, public_key: &PublicKey) -> bool {
        self.signatures.verify(message, signature, public_key)
    }
}
