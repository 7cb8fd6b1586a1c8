//! Fixtures shared by the unit tests.

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget, fields::fp::FpVar};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::context::{CryptoContext, PublicKey, Signature};
use crate::eddsa::{self, SecretScalar};
use crate::error::NotaryError;
use crate::inputs::CircuitInputs;
use crate::setup::CircuitBuilder;

pub fn test_context() -> CryptoContext {
    CryptoContext::circom()
}

pub fn test_keypair(seed: u64) -> (SecretScalar, PublicKey) {
    let secret = SecretScalar::from(seed + 1_000_003);
    (secret, eddsa::public_key(&secret).unwrap())
}

pub fn sign(secret: SecretScalar, message: Fr) -> Signature {
    eddsa::sign(&secret, message).unwrap()
}

/// Small R1CS circuit with the approve public signals
/// `[root, nullifierHash, recipient]`.
#[derive(Clone, Default)]
pub struct TestApproveCircuit {
    pub root: Option<Fr>,
    pub nullifier_hash: Option<Fr>,
    pub recipient: Option<Fr>,
}

impl ConstraintSynthesizer<Fr> for TestApproveCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let root = FpVar::new_input(cs.clone(), || {
            self.root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier_hash = FpVar::new_input(cs.clone(), || {
            self.nullifier_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let recipient = FpVar::new_input(cs.clone(), || {
            self.recipient.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // Tie every public signal into at least one constraint
        let recipient_square = FpVar::new_witness(cs.clone(), || {
            self.recipient
                .map(|r| r * r)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        (&recipient * &recipient).enforce_equal(&recipient_square)?;

        let product = FpVar::new_witness(cs, || {
            match (self.root, self.nullifier_hash) {
                (Some(root), Some(nullifier_hash)) => Ok(root * nullifier_hash),
                _ => Err(SynthesisError::AssignmentMissing),
            }
        })?;
        (&root * &nullifier_hash).enforce_equal(&product)?;

        Ok(())
    }
}

pub struct TestApproveBuilder;

impl CircuitBuilder for TestApproveBuilder {
    type Circuit = TestApproveCircuit;

    fn name(&self) -> &str {
        "approve"
    }

    fn blank(&self) -> TestApproveCircuit {
        TestApproveCircuit::default()
    }

    fn build(&self, inputs: &CircuitInputs) -> Result<(TestApproveCircuit, Vec<Fr>), NotaryError> {
        let root = inputs.scalar("root")?;
        let nullifier_hash = inputs.scalar("nullifierHash")?;
        let recipient = match inputs.get("sender") {
            Some(_) => inputs.scalar("sender")?,
            None => inputs.scalar("subject")?,
        };

        let circuit = TestApproveCircuit {
            root: Some(root),
            nullifier_hash: Some(nullifier_hash),
            recipient: Some(recipient),
        };
        Ok((circuit, vec![root, nullifier_hash, recipient]))
    }
}
