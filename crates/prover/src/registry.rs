//! Off-chain mirror of the on-chain commitment registry.
//!
//! The authoritative leaf order is the `index` carried by each
//! `CredentialCreated` event, never the order events arrive in. Every proof
//! handed out is cross-checked against the registry's known-root set, since a
//! proof over an unrecognised root can never verify on-chain.

use std::sync::Arc;

use ark_bn254::Fr;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use notary_merkle::field::serde_fr;
use notary_merkle::{
    to_fixed_hex, FieldHasher, IncrementalMerkleTree, MerkleProof, MultiProof, TreeConfig,
};

use crate::error::NotaryError;

/// A `CredentialCreated` event: one commitment appended to the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentEvent {
    #[serde(with = "serde_fr")]
    pub commitment: Fr,
    pub index: u64,
    pub timestamp: u64,
}

/// Read access to the registry being mirrored.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// All creation events with `index >= from_index`, in any order.
    async fn query_creation_events(&self, from_index: u64) -> Result<Vec<CommitmentEvent>, NotaryError>;

    /// Whether the registry accepts `root` (is in its recent-root history).
    async fn is_known_root(&self, root: &Fr) -> Result<bool, NotaryError>;
}

/// Sort events by index and return their commitments.
///
/// Indices must run contiguously from `from_index`; a gap or a duplicate
/// means the event log cannot reproduce the on-chain tree.
pub fn order_events(mut events: Vec<CommitmentEvent>, from_index: u64) -> Result<Vec<Fr>, NotaryError> {
    events.sort_by_key(|e| e.index);

    events
        .iter()
        .enumerate()
        .map(|(offset, event)| {
            let expected = from_index + offset as u64;
            if event.index != expected {
                return Err(NotaryError::InconsistentEventLog {
                    expected,
                    found: event.index,
                });
            }
            Ok(event.commitment)
        })
        .collect()
}

/// Rebuild the registry tree from genesis.
pub async fn build_merkle_tree<S: EventSource + ?Sized>(
    source: &S,
    hasher: Arc<dyn FieldHasher>,
    config: &TreeConfig,
) -> Result<IncrementalMerkleTree, NotaryError> {
    let events = source.query_creation_events(0).await?;
    let leaves = order_events(events, 0)?;
    let tree = IncrementalMerkleTree::with_leaves(config, hasher, &leaves)?;

    debug!(leaves = tree.len(), root = %to_fixed_hex(&tree.root()), "rebuilt registry tree");
    Ok(tree)
}

async fn ensure_known_root<S: EventSource + ?Sized>(source: &S, root: &Fr) -> Result<(), NotaryError> {
    if source.is_known_root(root).await? {
        Ok(())
    } else {
        warn!(root = %to_fixed_hex(root), "mirrored root is not known to the registry");
        Err(NotaryError::RootDesynchronized {
            root: to_fixed_hex(root),
        })
    }
}

/// Inclusion proof for `commitment` against the current registry state.
pub async fn generate_merkle_proof<S: EventSource + ?Sized>(
    source: &S,
    hasher: Arc<dyn FieldHasher>,
    config: &TreeConfig,
    commitment: &Fr,
) -> Result<MerkleProof, NotaryError> {
    let tree = build_merkle_tree(source, hasher, config).await?;
    ensure_known_root(source, &tree.root()).await?;
    Ok(tree.proof(commitment)?)
}

/// Batch inclusion proof for `commitments`, with the root it was built against.
pub async fn generate_multi_proof<S: EventSource + ?Sized>(
    source: &S,
    hasher: Arc<dyn FieldHasher>,
    config: &TreeConfig,
    commitments: &[Fr],
) -> Result<(Fr, MultiProof), NotaryError> {
    let tree = build_merkle_tree(source, hasher, config).await?;
    ensure_known_root(source, &tree.root()).await?;
    Ok((tree.root(), tree.multi_proof(commitments)?))
}

/// Registry mirror bound to one event source.
///
/// Without a cache every query rebuilds from genesis. With a cache, one tree
/// is kept behind a mutex and only events past its last leaf are fetched;
/// the cache is dropped whenever the root cross-check fails.
pub struct RegistryMirror<S: ?Sized> {
    hasher: Arc<dyn FieldHasher>,
    config: TreeConfig,
    cache: Option<Mutex<Option<IncrementalMerkleTree>>>,
    source: Arc<S>,
}

impl<S: EventSource + ?Sized> RegistryMirror<S> {
    pub fn new(source: Arc<S>, hasher: Arc<dyn FieldHasher>, config: TreeConfig) -> Result<Self, NotaryError> {
        config.validate()?;
        Ok(Self {
            hasher,
            config,
            cache: None,
            source,
        })
    }

    /// Keep the mirrored tree between queries.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(Mutex::new(None));
        self
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Current mirrored tree (a snapshot when caching).
    pub async fn tree(&self) -> Result<IncrementalMerkleTree, NotaryError> {
        let Some(cache) = &self.cache else {
            return build_merkle_tree(self.source.as_ref(), self.hasher.clone(), &self.config).await;
        };

        let mut guard = cache.lock().await;
        let mut tree = match guard.take() {
            Some(tree) => tree,
            None => IncrementalMerkleTree::new(&self.config, self.hasher.clone())?,
        };

        let from_index = tree.len() as u64;
        let events = self.source.query_creation_events(from_index).await?;
        let leaves = order_events(events, from_index)?;
        tree.bulk_insert(&leaves)?;
        if !leaves.is_empty() {
            info!(appended = leaves.len(), total = tree.len(), "synced registry mirror");
        }

        *guard = Some(tree.clone());
        Ok(tree)
    }

    /// Drop the cached tree so the next query rebuilds from genesis.
    pub async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            *cache.lock().await = None;
        }
    }

    pub async fn root(&self) -> Result<Fr, NotaryError> {
        Ok(self.tree().await?.root())
    }

    async fn checked_tree(&self) -> Result<IncrementalMerkleTree, NotaryError> {
        let tree = self.tree().await?;
        if let Err(e) = ensure_known_root(self.source.as_ref(), &tree.root()).await {
            self.invalidate().await;
            return Err(e);
        }
        Ok(tree)
    }

    pub async fn proof(&self, commitment: &Fr) -> Result<MerkleProof, NotaryError> {
        Ok(self.checked_tree().await?.proof(commitment)?)
    }

    pub async fn multi_proof(&self, commitments: &[Fr]) -> Result<(Fr, MultiProof), NotaryError> {
        let tree = self.checked_tree().await?;
        Ok((tree.root(), tree.multi_proof(commitments)?))
    }
}
