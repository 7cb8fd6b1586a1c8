//! Credential state and proof preparation for the private credential notary.
//!
//! This crate provides utilities for:
//! - Deriving direct and subject-bound credentials
//! - Checking EdDSA-Poseidon signatures on Baby Jubjub
//! - Mirroring the on-chain commitment registry from its events
//! - Preparing issue, approve and aggregate circuit inputs
//! - Running a prover with a timeout and shaping its output into calldata
//! - Groth16 trusted setup, proving and verification
//! - A reference ledger enforcing the notary contract's rules

pub mod address;
pub mod aggregate;
pub mod approve;
pub mod calldata;
pub mod config;
pub mod context;
pub mod credential;
pub mod eddsa;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod issue;
pub mod ledger;
pub mod nullifier;
pub mod registry;
pub mod setup;

#[cfg(test)]
mod test_support;

pub use address::Address;
pub use aggregate::{
    prepare_certree_proof_inputs, prepare_credential_field_inputs, prepare_field_proof_inputs,
    prepare_score_inputs, prepare_timeframe_inputs, CertreeProofInput, CredentialFieldInputs,
    FieldProofInputs, ScoreClaim, TimeframeClaim,
};
pub use approve::{generate_approve_proof, generate_approve_proof_from_registry, prepare_approve_inputs};
pub use calldata::{
    decode_calldata, export_calldata, prepare_call_data, ApproveCallData, DecodedCallData,
    NamedSignals, SignalSchema, APPROVE_V1, ISSUE_DIRECT_V1, ISSUE_SUBJECT_BOUND_V1,
};
pub use config::{DocumentConfig, NotaryConfig, ProverConfig, ServerConfig};
pub use context::{CryptoContext, PublicKey, Signature, SignatureVerifier};
pub use credential::{
    issuer_leaf, subject_of, Credential, CredentialScheme, DirectCredential, SubjectBoundCredential,
};
pub use eddsa::{EddsaPoseidon, SecretScalar};
pub use engine::{prove_with_timeout, ProofOutput, ProofVerifier, ProvingEngine};
pub use error::{NotaryError, TransitionError};
pub use inputs::{CircuitInputs, InputValue};
pub use issue::{generate_issue_proof, prepare_issue_inputs};
pub use ledger::{IssuedEvent, MemoryLedger, RevokedEvent, SharedLedger};
pub use nullifier::{NullifierRegistry, NullifierStatus};
pub use registry::{
    build_merkle_tree, generate_merkle_proof, generate_multi_proof, order_events, CommitmentEvent,
    EventSource, RegistryMirror,
};
pub use setup::{
    setup_circuit, CircuitBuilder, CircuitKeyPair, Groth16Prover, Groth16Verifier, SetupError,
};

use ark_bn254::Fr;

/// Common field type for all operations
pub type ConstraintF = Fr;
