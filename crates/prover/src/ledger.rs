//! In-process reference ledger with the notary contract's rules.
//!
//! Only the multisig may issue commitments and revoke credentials. Anyone
//! may approve with a proof; the sender becomes the credential subject.
//! Every rejected call leaves the ledger untouched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ark_bn254::Fr;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use notary_merkle::field::serde_fr;
use notary_merkle::{to_fixed_hex, FieldHasher, MerkleTreeWithHistory, TreeConfig};

use crate::address::Address;
use crate::engine::ProofVerifier;
use crate::error::{NotaryError, TransitionError};
use crate::nullifier::{NullifierRegistry, NullifierStatus};
use crate::registry::{CommitmentEvent, EventSource};

/// A `CredentialIssued` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedEvent {
    pub subject: Address,
    #[serde(with = "serde_fr")]
    pub nullifier_hash: Fr,
    pub timestamp: u64,
}

/// A `CredentialRevoked` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokedEvent {
    #[serde(with = "serde_fr")]
    pub nullifier_hash: Fr,
    pub reason: String,
    pub timestamp: u64,
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub struct MemoryLedger {
    tree: MerkleTreeWithHistory,
    commitments: HashSet<Fr>,
    nullifiers: NullifierRegistry,
    verifier: Option<Arc<dyn ProofVerifier>>,
    multisig: Address,
    created: Vec<CommitmentEvent>,
    issued: Vec<IssuedEvent>,
    revoked: Vec<RevokedEvent>,
}

impl MemoryLedger {
    pub fn new(
        config: &TreeConfig,
        hasher: Arc<dyn FieldHasher>,
        multisig: Address,
    ) -> Result<Self, NotaryError> {
        Ok(Self {
            tree: MerkleTreeWithHistory::new(config, hasher)?,
            commitments: HashSet::new(),
            nullifiers: NullifierRegistry::new(),
            verifier: None,
            multisig,
            created: Vec::new(),
            issued: Vec::new(),
            revoked: Vec::new(),
        })
    }

    /// Install the approve-circuit verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn ProofVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn multisig(&self) -> &Address {
        &self.multisig
    }

    fn only_multisig(&self, sender: &Address) -> Result<(), NotaryError> {
        if *sender != self.multisig {
            warn!(%sender, "rejected call from non-multisig sender");
            return Err(NotaryError::Unauthorized);
        }
        Ok(())
    }

    /// Register a commitment and return its leaf index.
    pub fn issue(&mut self, sender: &Address, commitment: Fr) -> Result<u64, NotaryError> {
        self.only_multisig(sender)?;
        if self.commitments.contains(&commitment) {
            return Err(NotaryError::DuplicateCommitment);
        }

        let index = self.tree.insert(commitment)? as u64;
        self.commitments.insert(commitment);
        self.created.push(CommitmentEvent {
            commitment,
            index,
            timestamp: now(),
        });

        info!(commitment = %to_fixed_hex(&commitment), index, "commitment registered");
        Ok(index)
    }

    /// Mark `nullifier_hash` as issued to `sender` once the approve proof
    /// over `[root, nullifierHash, sender]` checks out.
    pub fn approve(
        &mut self,
        sender: &Address,
        proof: &[u8],
        root: Fr,
        nullifier_hash: Fr,
    ) -> Result<(), NotaryError> {
        if self.nullifiers.is_issued(&nullifier_hash) {
            return Err(TransitionError::AlreadyIssued.into());
        }
        if !self.tree.is_known_root(&root) {
            return Err(NotaryError::UnknownRoot);
        }

        let verifier = self
            .verifier
            .as_ref()
            .ok_or(NotaryError::VerifierUnavailable)?;
        let signals = [root, nullifier_hash, sender.to_field()];
        if !verifier.verify(&signals, proof) {
            return Err(NotaryError::InvalidProof);
        }

        self.record_issued(*sender, nullifier_hash)
    }

    /// Mark a nullifier hash as issued without a proof, for fixtures.
    pub fn force_approve(&mut self, subject: Address, nullifier_hash: Fr) -> Result<(), NotaryError> {
        self.record_issued(subject, nullifier_hash)
    }

    fn record_issued(&mut self, subject: Address, nullifier_hash: Fr) -> Result<(), NotaryError> {
        self.nullifiers.approve(nullifier_hash)?;
        self.issued.push(IssuedEvent {
            subject,
            nullifier_hash,
            timestamp: now(),
        });

        info!(%subject, nullifier_hash = %to_fixed_hex(&nullifier_hash), "credential issued");
        Ok(())
    }

    pub fn revoke(&mut self, sender: &Address, nullifier_hash: Fr, reason: &str) -> Result<(), NotaryError> {
        self.only_multisig(sender)?;
        self.nullifiers.revoke(nullifier_hash, reason)?;
        self.revoked.push(RevokedEvent {
            nullifier_hash,
            reason: reason.to_string(),
            timestamp: now(),
        });

        info!(nullifier_hash = %to_fixed_hex(&nullifier_hash), reason, "credential revoked");
        Ok(())
    }

    pub fn is_issued(&self, nullifier_hash: &Fr) -> bool {
        self.nullifiers.is_issued(nullifier_hash)
    }

    pub fn is_issued_batch(&self, nullifier_hashes: &[Fr]) -> Vec<bool> {
        self.nullifiers.is_issued_batch(nullifier_hashes)
    }

    pub fn status(&self, nullifier_hash: &Fr) -> NullifierStatus {
        self.nullifiers.status(nullifier_hash)
    }

    pub fn last_root(&self) -> Fr {
        self.tree.last_root()
    }

    pub fn is_known_root(&self, root: &Fr) -> bool {
        self.tree.is_known_root(root)
    }

    pub fn next_index(&self) -> u64 {
        self.tree.next_index() as u64
    }

    pub fn created_events(&self) -> &[CommitmentEvent] {
        &self.created
    }

    pub fn issued_events(&self) -> &[IssuedEvent] {
        &self.issued
    }

    pub fn revoked_events(&self) -> &[RevokedEvent] {
        &self.revoked
    }
}

/// A ledger shared between request handlers.
#[derive(Clone)]
pub struct SharedLedger(Arc<RwLock<MemoryLedger>>);

impl SharedLedger {
    pub fn new(ledger: MemoryLedger) -> Self {
        Self(Arc::new(RwLock::new(ledger)))
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, MemoryLedger> {
        self.0.read().await
    }

    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, MemoryLedger> {
        self.0.write().await
    }
}

#[async_trait]
impl EventSource for SharedLedger {
    async fn query_creation_events(&self, from_index: u64) -> Result<Vec<CommitmentEvent>, NotaryError> {
        Ok(self
            .read()
            .await
            .created_events()
            .iter()
            .filter(|e| e.index >= from_index)
            .cloned()
            .collect())
    }

    async fn is_known_root(&self, root: &Fr) -> Result<bool, NotaryError> {
        Ok(self.read().await.is_known_root(root))
    }
}

#[cfg(test)]
mod tests;
