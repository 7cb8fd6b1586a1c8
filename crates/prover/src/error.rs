//! Error taxonomy for the notary pipeline.

use thiserror::Error;

use notary_merkle::TreeError;

use crate::setup::SetupError;

/// A nullifier lifecycle transition that the notary refuses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Credential already issued")]
    AlreadyIssued,
    #[error("Credential not found")]
    NotFound,
    #[error("Credential already revoked")]
    AlreadyRevoked,
    #[error("A reason must be given")]
    EmptyReason,
}

/// Errors that can occur anywhere between event replay and calldata decoding
#[derive(Error, Debug)]
pub enum NotaryError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("Invalid signature for commitment {0}")]
    InvalidSignature(String),
    #[error("Merkle tree is corrupted: root {root} is not known on-chain")]
    RootDesynchronized { root: String },
    #[error("Malformed calldata: {0}")]
    MalformedCalldata(String),
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(#[from] TransitionError),
    #[error("Prover failed: {0}")]
    ProverFailure(String),
    #[error("Inconsistent event log: expected index {expected}, found {found}")]
    InconsistentEventLog { expected: u64, found: u64 },
    #[error("Circuit witness mismatch: {0}")]
    WitnessMismatch(String),
    #[error("Commitment already registered")]
    DuplicateCommitment,
    #[error("Merkle root not found")]
    UnknownRoot,
    #[error("Invalid issuance proof")]
    InvalidProof,
    #[error("Only multisig")]
    Unauthorized,
    #[error("No verifying key loaded")]
    VerifierUnavailable,
    #[error("No prover loaded for the {0} circuit")]
    ProverUnavailable(String),
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Event source error: {0}")]
    EventSource(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotaryError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NotaryError::RootDesynchronized { .. }
                | NotaryError::ProverFailure(_)
                | NotaryError::EventSource(_)
        )
    }
}
