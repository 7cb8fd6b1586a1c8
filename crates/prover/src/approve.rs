//! Approve proof-input preparation.
//!
//! The approve circuit proves membership of the holder's commitment in the
//! registry tree and binds the proof to a recipient address, so a proof
//! lifted from the mempool is useless to anyone else.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use notary_merkle::{to_fixed_hex, MerkleProof, TreeConfig};

use crate::address::Address;
use crate::context::CryptoContext;
use crate::credential::Credential;
use crate::engine::{prove_with_timeout, ProofOutput, ProvingEngine};
use crate::error::NotaryError;
use crate::inputs::CircuitInputs;
use crate::registry::{generate_merkle_proof, EventSource};

/// Build the approve circuit inputs.
///
/// Direct: `{root, nullifierHash, subject, nullifier, secret, pathElements, pathIndices}`
/// with `subject` set to the recipient.
/// Subject-bound: `{root, nullifierHash, sender, nullifier, subject, secret,
/// pathElements, pathIndices}` with `sender` set to the recipient and
/// `nullifier` to the credential's document root.
pub fn prepare_approve_inputs(
    ctx: &CryptoContext,
    merkle_proof: &MerkleProof,
    recipient: &Address,
    credential: &Credential,
) -> Result<CircuitInputs, NotaryError> {
    if merkle_proof.leaf != credential.commitment() {
        return Err(NotaryError::WitnessMismatch(
            "merkle proof is for a different commitment".to_string(),
        ));
    }
    if !merkle_proof.verify(ctx.hasher().as_ref()) {
        return Err(NotaryError::WitnessMismatch(
            "merkle proof does not reproduce its root".to_string(),
        ));
    }

    let path_elements = merkle_proof.path_elements.clone();
    let path_indices = merkle_proof.packed_indices();

    let inputs = match credential {
        Credential::Direct(c) => CircuitInputs::new()
            .with("root", merkle_proof.root)
            .with("nullifierHash", c.nullifier_hash)
            .with("subject", recipient.to_field())
            .with("nullifier", c.nullifier)
            .with("secret", c.secret)
            .with("pathElements", path_elements)
            .with("pathIndices", path_indices),
        Credential::SubjectBound(c) => CircuitInputs::new()
            .with("root", merkle_proof.root)
            .with("nullifierHash", c.nullifier_hash)
            .with("sender", recipient.to_field())
            .with("nullifier", c.root)
            .with("subject", c.subject)
            .with("secret", c.secret)
            .with("pathElements", path_elements)
            .with("pathIndices", path_indices),
    };

    debug!(
        root = %to_fixed_hex(&merkle_proof.root),
        leaf_index = merkle_proof.leaf_index,
        %recipient,
        "prepared approve inputs"
    );
    Ok(inputs)
}

/// Prepare inputs from a given Merkle proof and run the approve prover.
pub async fn generate_approve_proof(
    ctx: &CryptoContext,
    engine: Arc<dyn ProvingEngine>,
    merkle_proof: &MerkleProof,
    recipient: &Address,
    credential: &Credential,
    timeout: Duration,
) -> Result<ProofOutput, NotaryError> {
    let inputs = prepare_approve_inputs(ctx, merkle_proof, recipient, credential)?;
    prove_with_timeout(engine, inputs, timeout).await
}

/// Mirror the registry, check its root, then prove approval for `credential`.
pub async fn generate_approve_proof_from_registry<S: EventSource + ?Sized>(
    source: &S,
    ctx: &CryptoContext,
    config: &TreeConfig,
    engine: Arc<dyn ProvingEngine>,
    recipient: &Address,
    credential: &Credential,
    timeout: Duration,
) -> Result<ProofOutput, NotaryError> {
    let merkle_proof =
        generate_merkle_proof(source, ctx.hasher().clone(), config, &credential.commitment()).await?;
    generate_approve_proof(ctx, engine, &merkle_proof, recipient, credential, timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{DirectCredential, SubjectBoundCredential};
    use crate::test_support::{test_context, test_keypair};
    use ark_bn254::Fr;
    use notary_merkle::{IncrementalMerkleTree, TreeConfig};

    fn recipient() -> Address {
        "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap()
    }

    #[test]
    fn test_direct_inputs() {
        let ctx = test_context();
        let credential: Credential = DirectCredential::new(&ctx, Fr::from(7u64), Fr::from(3u64))
            .unwrap()
            .into();
        let mut tree = IncrementalMerkleTree::new(&TreeConfig::new(5), ctx.hasher().clone()).unwrap();
        tree.bulk_insert(&[Fr::from(1u64), Fr::from(2u64), credential.commitment()])
            .unwrap();
        let proof = tree.proof(&credential.commitment()).unwrap();

        let inputs = prepare_approve_inputs(&ctx, &proof, &recipient(), &credential).unwrap();
        assert_eq!(
            inputs.names().collect::<Vec<_>>(),
            vec!["root", "nullifierHash", "subject", "nullifier", "secret", "pathElements", "pathIndices"]
        );
        assert_eq!(inputs.scalar("root").unwrap(), tree.root());
        assert_eq!(inputs.scalar("subject").unwrap(), recipient().to_field());
        assert_eq!(inputs.scalar("pathIndices").unwrap(), Fr::from(2u64));
        assert_eq!(inputs.flattened("pathElements").unwrap().len(), 5);
    }

    #[test]
    fn test_subject_bound_inputs() {
        let ctx = test_context();
        let (_, pk) = test_keypair(4);
        let credential: Credential =
            SubjectBoundCredential::new(&ctx, Fr::from(5u64), &pk, Fr::from(88u64))
                .unwrap()
                .into();
        let tree = IncrementalMerkleTree::with_leaves(
            &TreeConfig::new(4),
            ctx.hasher().clone(),
            &[credential.commitment()],
        )
        .unwrap();
        let proof = tree.path(0).unwrap();

        let inputs = prepare_approve_inputs(&ctx, &proof, &recipient(), &credential).unwrap();
        assert_eq!(
            inputs.names().collect::<Vec<_>>(),
            vec![
                "root",
                "nullifierHash",
                "sender",
                "nullifier",
                "subject",
                "secret",
                "pathElements",
                "pathIndices"
            ]
        );
        assert_eq!(inputs.scalar("nullifier").unwrap(), Fr::from(88u64));
        assert_eq!(inputs.scalar("sender").unwrap(), recipient().to_field());
    }

    #[test]
    fn test_proof_must_match_commitment() {
        let ctx = test_context();
        let credential: Credential = DirectCredential::new(&ctx, Fr::from(7u64), Fr::from(3u64))
            .unwrap()
            .into();
        let tree = IncrementalMerkleTree::with_leaves(
            &TreeConfig::new(4),
            ctx.hasher().clone(),
            &[Fr::from(1u64), credential.commitment()],
        )
        .unwrap();

        let other = tree.path(0).unwrap();
        assert!(matches!(
            prepare_approve_inputs(&ctx, &other, &recipient(), &credential),
            Err(NotaryError::WitnessMismatch(_))
        ));

        let mut stale = tree.path(1).unwrap();
        stale.root += Fr::from(1u64);
        assert!(matches!(
            prepare_approve_inputs(&ctx, &stale, &recipient(), &credential),
            Err(NotaryError::WitnessMismatch(_))
        ));
    }
}
