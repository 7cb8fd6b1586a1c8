//! Nullifier lifecycle state.
//!
//! `Unknown -> Issued -> Issued + Revoked`. `issued` never resets and
//! `revoked` is only ever set on an issued entry. A rejected transition
//! leaves the registry unchanged.

use std::collections::HashMap;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use tracing::debug;

use notary_merkle::to_decimal;

use crate::error::TransitionError;

/// Per-nullifier-hash flags, as stored by the notary contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierStatus {
    pub issued: bool,
    pub revoked: bool,
}

#[derive(Clone, Debug, Default)]
pub struct NullifierRegistry {
    states: HashMap<Fr, NullifierStatus>,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, nullifier_hash: &Fr) -> NullifierStatus {
        self.states.get(nullifier_hash).copied().unwrap_or_default()
    }

    pub fn is_issued(&self, nullifier_hash: &Fr) -> bool {
        self.status(nullifier_hash).issued
    }

    pub fn is_revoked(&self, nullifier_hash: &Fr) -> bool {
        self.status(nullifier_hash).revoked
    }

    /// Issued flag for each hash, in order.
    pub fn is_issued_batch(&self, nullifier_hashes: &[Fr]) -> Vec<bool> {
        nullifier_hashes.iter().map(|h| self.is_issued(h)).collect()
    }

    /// Mark a nullifier hash as issued.
    pub fn approve(&mut self, nullifier_hash: Fr) -> Result<(), TransitionError> {
        if self.is_issued(&nullifier_hash) {
            return Err(TransitionError::AlreadyIssued);
        }

        self.states.insert(
            nullifier_hash,
            NullifierStatus {
                issued: true,
                revoked: false,
            },
        );
        debug!(nullifier_hash = %to_decimal(&nullifier_hash), "nullifier issued");
        Ok(())
    }

    /// Revoke an issued credential. The reason is checked first.
    pub fn revoke(&mut self, nullifier_hash: Fr, reason: &str) -> Result<(), TransitionError> {
        if reason.is_empty() {
            return Err(TransitionError::EmptyReason);
        }

        let state = self
            .states
            .get_mut(&nullifier_hash)
            .filter(|s| s.issued)
            .ok_or(TransitionError::NotFound)?;
        if state.revoked {
            return Err(TransitionError::AlreadyRevoked);
        }
        state.revoked = true;

        debug!(nullifier_hash = %to_decimal(&nullifier_hash), reason, "nullifier revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(v: u64) -> Fr {
        Fr::from(v)
    }

    #[test]
    fn test_unknown_is_blank() {
        let registry = NullifierRegistry::new();
        assert_eq!(registry.status(&h(1)), NullifierStatus::default());
    }

    #[test]
    fn test_approve_then_revoke() {
        let mut registry = NullifierRegistry::new();
        registry.approve(h(1)).unwrap();
        assert!(registry.is_issued(&h(1)));
        assert!(!registry.is_revoked(&h(1)));

        registry.revoke(h(1), "some reason").unwrap();
        assert_eq!(
            registry.status(&h(1)),
            NullifierStatus {
                issued: true,
                revoked: true
            }
        );
    }

    #[test]
    fn test_double_approve_rejected() {
        let mut registry = NullifierRegistry::new();
        registry.approve(h(1)).unwrap();
        assert_eq!(registry.approve(h(1)), Err(TransitionError::AlreadyIssued));

        registry.revoke(h(1), "reason").unwrap();
        // revocation does not reopen issuance
        assert_eq!(registry.approve(h(1)), Err(TransitionError::AlreadyIssued));
        assert!(registry.is_revoked(&h(1)));
    }

    #[test]
    fn test_revoke_guards() {
        let mut registry = NullifierRegistry::new();

        assert_eq!(registry.revoke(h(1), ""), Err(TransitionError::EmptyReason));
        assert_eq!(registry.revoke(h(1), "reason"), Err(TransitionError::NotFound));
        assert_eq!(registry.status(&h(1)), NullifierStatus::default());

        registry.approve(h(1)).unwrap();
        assert_eq!(registry.revoke(h(1), ""), Err(TransitionError::EmptyReason));
        assert!(!registry.is_revoked(&h(1)));

        registry.revoke(h(1), "something").unwrap();
        assert_eq!(
            registry.revoke(h(1), "another thing"),
            Err(TransitionError::AlreadyRevoked)
        );
    }

    #[test]
    fn test_batch_query() {
        let mut registry = NullifierRegistry::new();
        for i in 0..3 {
            registry.approve(h(i)).unwrap();
        }
        assert_eq!(
            registry.is_issued_batch(&[h(3), h(0), h(1), h(4)]),
            vec![false, true, true, false]
        );
    }
}
