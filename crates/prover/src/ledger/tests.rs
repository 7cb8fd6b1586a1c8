//! Reference ledger tests, including end-to-end approval over Groth16.

use std::time::Duration;

use ark_ff::Zero;
use ark_std::rand::{rngs::StdRng, SeedableRng};

use notary_merkle::CircomPoseidon;

use super::*;
use crate::approve::generate_approve_proof_from_registry;
use crate::calldata::ApproveCallData;
use crate::credential::{Credential, DirectCredential};
use crate::engine::ProvingEngine;
use crate::setup::{setup_circuit, Groth16Prover, Groth16Verifier};
use crate::test_support::{test_context, TestApproveBuilder};

fn multisig() -> Address {
    "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
}

fn sender1() -> Address {
    "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap()
}

fn sender2() -> Address {
    "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc".parse().unwrap()
}

fn config() -> TreeConfig {
    TreeConfig::new(5)
}

fn ledger() -> MemoryLedger {
    MemoryLedger::new(&config(), Arc::new(CircomPoseidon), multisig()).unwrap()
}

fn h(v: u64) -> Fr {
    Fr::from(v)
}

struct ProvingFixture {
    ledger: SharedLedger,
    engine: Arc<dyn ProvingEngine>,
}

fn proving_fixture() -> ProvingFixture {
    let mut rng = StdRng::seed_from_u64(42);
    let keys = setup_circuit(&TestApproveBuilder, &mut rng).unwrap();
    let verifier = Groth16Verifier::from_vk(&keys.verifying_key).unwrap();

    ProvingFixture {
        ledger: SharedLedger::new(ledger().with_verifier(Arc::new(verifier))),
        engine: Arc::new(Groth16Prover::new(TestApproveBuilder, keys.proving_key)),
    }
}

/// Issue a direct credential and produce approve calldata for `recipient`.
async fn issued_calldata(fixture: &ProvingFixture, recipient: &Address) -> ApproveCallData {
    let ctx = test_context();
    let mut rng = StdRng::seed_from_u64(7);
    let credential: Credential = DirectCredential::random(&ctx, &mut rng).unwrap().into();

    {
        let mut ledger = fixture.ledger.write().await;
        ledger.issue(&multisig(), h(1)).unwrap();
        ledger.issue(&multisig(), credential.commitment()).unwrap();
    }

    let output = generate_approve_proof_from_registry(
        &fixture.ledger,
        &ctx,
        &config(),
        fixture.engine.clone(),
        recipient,
        &credential,
        Duration::from_secs(60),
    )
    .await
    .unwrap();
    ApproveCallData::from_output(&output).unwrap()
}

fn parse(text: &str) -> Fr {
    notary_merkle::parse_field(text).unwrap()
}

#[test]
fn test_issue_registers_commitment() {
    let mut ledger = ledger();
    let empty_root = ledger.last_root();

    assert_eq!(ledger.issue(&multisig(), h(42)).unwrap(), 0);
    assert_eq!(ledger.issue(&multisig(), h(43)).unwrap(), 1);
    assert_eq!(ledger.next_index(), 2);
    assert_ne!(ledger.last_root(), empty_root);
    assert!(ledger.is_known_root(&empty_root));

    let events = ledger.created_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].commitment, h(42));
    assert_eq!(events[1].index, 1);
}

#[test]
fn test_issue_is_multisig_only() {
    let mut ledger = ledger();
    assert!(matches!(
        ledger.issue(&sender1(), h(42)),
        Err(NotaryError::Unauthorized)
    ));
    assert!(ledger.created_events().is_empty());
}

#[test]
fn test_duplicate_commitment_rejected() {
    let mut ledger = ledger();
    ledger.issue(&multisig(), h(42)).unwrap();
    let root = ledger.last_root();

    let err = ledger.issue(&multisig(), h(42)).unwrap_err();
    assert_eq!(err.to_string(), "Commitment already registered");
    assert_eq!(ledger.last_root(), root);
    assert_eq!(ledger.next_index(), 1);
}

#[test]
fn test_approve_check_order() {
    let mut ledger = ledger();

    // Unknown root is reported before the (missing) verifier is consulted
    let err = ledger.approve(&sender1(), &[0u8], h(0), h(1)).unwrap_err();
    assert_eq!(err.to_string(), "Merkle root not found");

    // Already issued wins over the unknown root
    ledger.force_approve(sender1(), h(1)).unwrap();
    let err = ledger.approve(&sender1(), &[0u8], h(0), h(1)).unwrap_err();
    assert!(matches!(
        err,
        NotaryError::InvalidStateTransition(TransitionError::AlreadyIssued)
    ));
}

#[test]
fn test_approve_without_verifier() {
    let mut ledger = ledger();
    ledger.issue(&multisig(), h(5)).unwrap();
    let root = ledger.last_root();

    assert!(matches!(
        ledger.approve(&sender1(), &[0u8], root, h(1)),
        Err(NotaryError::VerifierUnavailable)
    ));
    assert!(!ledger.is_issued(&h(1)));
}

#[test]
fn test_is_issued_batch() {
    let mut ledger = ledger();
    assert!(!ledger.is_issued(&h(1)));

    for i in 0..3 {
        ledger.force_approve(sender1(), h(i)).unwrap();
    }
    assert_eq!(ledger.is_issued_batch(&[h(0), h(1), h(2)]), vec![true, true, true]);
    assert_eq!(
        ledger.is_issued_batch(&[h(3), h(0), h(1), h(4)]),
        vec![false, true, true, false]
    );
}

#[test]
fn test_revoke_lifecycle() {
    let mut ledger = ledger();
    ledger.force_approve(sender1(), h(1)).unwrap();

    ledger.revoke(&multisig(), h(1), "some reason").unwrap();
    assert_eq!(
        ledger.status(&h(1)),
        NullifierStatus {
            issued: true,
            revoked: true
        }
    );
    assert_eq!(ledger.revoked_events().len(), 1);
    assert_eq!(ledger.revoked_events()[0].reason, "some reason");

    let err = ledger.revoke(&multisig(), h(1), "again").unwrap_err();
    assert!(matches!(
        err,
        NotaryError::InvalidStateTransition(TransitionError::AlreadyRevoked)
    ));
}

#[test]
fn test_revoke_guards() {
    let mut ledger = ledger();

    let err = ledger.revoke(&multisig(), h(1), "something").unwrap_err();
    assert!(err.to_string().contains("Credential not found"));
    assert_eq!(ledger.status(&h(1)), NullifierStatus::default());

    ledger.force_approve(sender1(), h(1)).unwrap();
    let err = ledger.revoke(&multisig(), h(1), "").unwrap_err();
    assert!(err.to_string().contains("A reason must be given"));
    assert!(!ledger.status(&h(1)).revoked);

    assert!(matches!(
        ledger.revoke(&sender1(), h(1), "mine"),
        Err(NotaryError::Unauthorized)
    ));
    assert!(ledger.revoked_events().is_empty());
}

#[tokio::test]
async fn test_shared_ledger_is_event_source() {
    let shared = SharedLedger::new(ledger());
    {
        let mut ledger = shared.write().await;
        for c in [10, 20, 30] {
            ledger.issue(&multisig(), h(c)).unwrap();
        }
    }

    let events = shared.query_creation_events(1).await.unwrap();
    assert_eq!(events.iter().map(|e| e.index).collect::<Vec<_>>(), vec![1, 2]);

    let root = shared.read().await.last_root();
    assert!(shared.is_known_root(&root).await.unwrap());
    assert!(!shared.is_known_root(&Fr::zero()).await.unwrap());
}

#[tokio::test]
async fn test_approve_end_to_end() {
    let fixture = proving_fixture();
    let calldata = issued_calldata(&fixture, &sender1()).await;

    let proof = calldata.proof_bytes().unwrap();
    let root = parse(&calldata.root);
    let nullifier_hash = parse(&calldata.nullifier_hash);

    let mut ledger = fixture.ledger.write().await;
    ledger.approve(&sender1(), &proof, root, nullifier_hash).unwrap();

    assert!(ledger.is_issued(&nullifier_hash));
    assert!(!ledger.status(&nullifier_hash).revoked);
    let event = &ledger.issued_events()[0];
    assert_eq!(event.subject, sender1());
    assert_eq!(event.nullifier_hash, nullifier_hash);

    let err = ledger
        .approve(&sender1(), &proof, root, nullifier_hash)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid state transition: Credential already issued"
    );
}

#[tokio::test]
async fn test_approve_rejects_tampering() {
    let fixture = proving_fixture();
    let calldata = issued_calldata(&fixture, &sender1()).await;

    let proof = calldata.proof_bytes().unwrap();
    let root = parse(&calldata.root);
    let nullifier_hash = parse(&calldata.nullifier_hash);
    let mut ledger = fixture.ledger.write().await;

    let wrong_sender = ledger.approve(&sender2(), &proof, root, nullifier_hash);
    assert!(matches!(wrong_sender, Err(NotaryError::InvalidProof)));

    let zero_nullifier = ledger.approve(&sender1(), &proof, root, Fr::zero());
    assert_eq!(zero_nullifier.unwrap_err().to_string(), "Invalid issuance proof");

    let mut flipped = calldata.clone();
    flipped.proof = calldata.proof.replacen('1', "0", 1);
    assert_ne!(flipped.proof, calldata.proof);
    let flipped = ledger.approve(&sender1(), &flipped.proof_bytes().unwrap(), root, nullifier_hash);
    assert!(matches!(flipped, Err(NotaryError::InvalidProof)));

    assert!(!ledger.is_issued(&nullifier_hash));
    assert!(ledger.issued_events().is_empty());
}

#[tokio::test]
async fn test_approve_rejects_other_credentials_nullifier() {
    let fixture = proving_fixture();
    let calldata = issued_calldata(&fixture, &sender1()).await;

    let ctx = test_context();
    let mut rng = StdRng::seed_from_u64(8);
    let other: Credential = DirectCredential::random(&ctx, &mut rng).unwrap().into();

    let proof = calldata.proof_bytes().unwrap();
    let nullifier_hash = parse(&calldata.nullifier_hash);
    let mut ledger = fixture.ledger.write().await;
    ledger.issue(&multisig(), other.commitment()).unwrap();
    assert_ne!(other.nullifier_hash(), nullifier_hash);

    let root = ledger.last_root();
    let next_index = ledger.next_index();
    let stolen = ledger.approve(&sender1(), &proof, root, other.nullifier_hash());
    assert!(matches!(stolen, Err(NotaryError::InvalidProof)));

    let stale_root = parse(&calldata.root);
    let stolen = ledger.approve(&sender1(), &proof, stale_root, other.nullifier_hash());
    assert!(matches!(stolen, Err(NotaryError::InvalidProof)));

    assert!(!ledger.is_issued(&other.nullifier_hash()));
    assert!(!ledger.is_issued(&nullifier_hash));
    assert!(ledger.issued_events().is_empty());
    assert_eq!(ledger.last_root(), root);
    assert_eq!(ledger.next_index(), next_index);
}
