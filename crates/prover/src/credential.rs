//! Credential model.
//!
//! Two commitment schemes coexist:
//! - `Direct`: `commitment = hash2(nullifier, secret)`,
//!   `nullifierHash = hash([nullifier])`
//! - `SubjectBound`: `subject = hash2(pk.x, pk.y)`,
//!   `commitment = hash([root, subject, secret])`, `nullifierHash = hash([root])`,
//!   where `root` is the credential's document tree root.

use ark_bn254::Fr;
use ark_std::rand::Rng;
use serde::{Deserialize, Serialize};

use notary_merkle::field::serde_fr;
use notary_merkle::random_field;

use crate::context::{CryptoContext, PublicKey};
use crate::error::NotaryError;

/// Which commitment scheme a credential uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialScheme {
    Direct,
    SubjectBound,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectCredential {
    #[serde(with = "serde_fr")]
    pub secret: Fr,
    #[serde(with = "serde_fr")]
    pub nullifier: Fr,
    #[serde(with = "serde_fr")]
    pub commitment: Fr,
    #[serde(with = "serde_fr")]
    pub nullifier_hash: Fr,
}

impl DirectCredential {
    pub fn new(ctx: &CryptoContext, nullifier: Fr, secret: Fr) -> Result<Self, NotaryError> {
        Ok(Self {
            secret,
            nullifier,
            commitment: ctx.hash2(nullifier, secret)?,
            nullifier_hash: ctx.hash(&[nullifier])?,
        })
    }

    /// Fresh credential with random nullifier and secret.
    pub fn random<R: Rng + ?Sized>(ctx: &CryptoContext, rng: &mut R) -> Result<Self, NotaryError> {
        let nullifier = random_field(rng);
        let secret = random_field(rng);
        Self::new(ctx, nullifier, secret)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectBoundCredential {
    #[serde(with = "serde_fr")]
    pub secret: Fr,
    /// Document tree root the credential attests to
    #[serde(with = "serde_fr")]
    pub root: Fr,
    #[serde(with = "serde_fr")]
    pub subject: Fr,
    #[serde(with = "serde_fr")]
    pub commitment: Fr,
    #[serde(with = "serde_fr")]
    pub nullifier_hash: Fr,
}

impl SubjectBoundCredential {
    pub fn new(
        ctx: &CryptoContext,
        secret: Fr,
        public_key: &PublicKey,
        root: Fr,
    ) -> Result<Self, NotaryError> {
        let subject = subject_of(ctx, public_key)?;
        Ok(Self {
            secret,
            root,
            subject,
            commitment: ctx.hash(&[root, subject, secret])?,
            nullifier_hash: ctx.hash(&[root])?,
        })
    }
}

/// A credential under either scheme.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "camelCase")]
pub enum Credential {
    Direct(DirectCredential),
    SubjectBound(SubjectBoundCredential),
}

impl Credential {
    pub fn scheme(&self) -> CredentialScheme {
        match self {
            Credential::Direct(_) => CredentialScheme::Direct,
            Credential::SubjectBound(_) => CredentialScheme::SubjectBound,
        }
    }

    pub fn commitment(&self) -> Fr {
        match self {
            Credential::Direct(c) => c.commitment,
            Credential::SubjectBound(c) => c.commitment,
        }
    }

    pub fn nullifier_hash(&self) -> Fr {
        match self {
            Credential::Direct(c) => c.nullifier_hash,
            Credential::SubjectBound(c) => c.nullifier_hash,
        }
    }

    pub fn secret(&self) -> Fr {
        match self {
            Credential::Direct(c) => c.secret,
            Credential::SubjectBound(c) => c.secret,
        }
    }
}

impl From<DirectCredential> for Credential {
    fn from(value: DirectCredential) -> Self {
        Credential::Direct(value)
    }
}

impl From<SubjectBoundCredential> for Credential {
    fn from(value: SubjectBoundCredential) -> Self {
        Credential::SubjectBound(value)
    }
}

/// Subject identifier derived from a public key: `hash2(pk.x, pk.y)`.
pub fn subject_of(ctx: &CryptoContext, public_key: &PublicKey) -> Result<Fr, NotaryError> {
    ctx.hash2(public_key.x, public_key.y)
}

/// Issuer registry leaf for a document: `hash([documentRoot])`.
pub fn issuer_leaf(ctx: &CryptoContext, document_root: Fr) -> Result<Fr, NotaryError> {
    ctx.hash(&[document_root])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_context;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use notary_merkle::{poseidon_hash, poseidon_hash_many, poseidon_hash_two};

    #[test]
    fn test_direct_derivation() {
        let ctx = test_context();
        let credential = DirectCredential::new(&ctx, Fr::from(7u64), Fr::from(3u64)).unwrap();

        assert_eq!(
            credential.commitment,
            poseidon_hash_two(Fr::from(7u64), Fr::from(3u64)).unwrap()
        );
        assert_eq!(credential.nullifier_hash, poseidon_hash(Fr::from(7u64)).unwrap());
    }

    #[test]
    fn test_subject_bound_derivation() {
        let ctx = test_context();
        let pk = PublicKey {
            x: Fr::from(11u64),
            y: Fr::from(12u64),
        };
        let root = Fr::from(99u64);
        let credential = SubjectBoundCredential::new(&ctx, Fr::from(5u64), &pk, root).unwrap();

        let subject = poseidon_hash_two(pk.x, pk.y).unwrap();
        assert_eq!(credential.subject, subject);
        assert_eq!(
            credential.commitment,
            poseidon_hash_many(&[root, subject, Fr::from(5u64)]).unwrap()
        );
        assert_eq!(credential.nullifier_hash, poseidon_hash(root).unwrap());
        assert_eq!(issuer_leaf(&ctx, root).unwrap(), credential.nullifier_hash);
    }

    #[test]
    fn test_schemes_differ_for_same_material() {
        let ctx = test_context();
        let pk = PublicKey {
            x: Fr::from(1u64),
            y: Fr::from(2u64),
        };
        let direct: Credential = DirectCredential::new(&ctx, Fr::from(4u64), Fr::from(5u64))
            .unwrap()
            .into();
        let bound: Credential = SubjectBoundCredential::new(&ctx, Fr::from(5u64), &pk, Fr::from(4u64))
            .unwrap()
            .into();

        assert_eq!(direct.scheme(), CredentialScheme::Direct);
        assert_eq!(bound.scheme(), CredentialScheme::SubjectBound);
        assert_ne!(direct.commitment(), bound.commitment());
        assert_eq!(direct.secret(), bound.secret());
    }

    #[test]
    fn test_random_credentials_are_distinct() {
        let ctx = test_context();
        let mut rng = StdRng::seed_from_u64(42);
        let a = DirectCredential::random(&ctx, &mut rng).unwrap();
        let b = DirectCredential::random(&ctx, &mut rng).unwrap();
        assert_ne!(a.commitment, b.commitment);
        assert_ne!(a.nullifier, a.secret);
    }

    #[test]
    fn test_tagged_json() {
        let ctx = test_context();
        let credential: Credential = DirectCredential::new(&ctx, Fr::from(7u64), Fr::from(3u64))
            .unwrap()
            .into();
        let json = serde_json::to_value(&credential).unwrap();

        assert_eq!(json["scheme"], "direct");
        assert_eq!(json["nullifier"], "7");
        let back: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(back, credential);
    }
}
