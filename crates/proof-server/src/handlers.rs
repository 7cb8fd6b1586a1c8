//! HTTP request handlers for the notary ledger and proof helpers.

use std::collections::BTreeMap;
use std::sync::Arc;

use ark_bn254::Fr;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use notary_merkle::field::{serde_fr, serde_fr_vec};
use notary_merkle::{to_fixed_hex, DocumentTree, FieldValue, MerkleProof, MultiProof, TreeError};
use notary_prover::engine::hex_bytes;
use notary_prover::{
    generate_approve_proof_from_registry, generate_merkle_proof, generate_multi_proof,
    prepare_issue_inputs, prove_with_timeout, Address, ApproveCallData, Credential,
    DirectCredential, NotaryError, NullifierStatus, ProofOutput, PublicKey, Signature,
};

use crate::AppState;

type SharedState = State<Arc<RwLock<AppState>>>;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A notary error on its way out as JSON.
pub struct ApiError(NotaryError);

impl From<NotaryError> for ApiError {
    fn from(err: NotaryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NotaryError::Unauthorized => StatusCode::FORBIDDEN,
            NotaryError::Tree(TreeError::LeafNotFound(_)) => StatusCode::NOT_FOUND,
            NotaryError::VerifierUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            NotaryError::ProverUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============ Ledger ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootResponse {
    pub root: String,
    pub next_index: u64,
}

pub async fn root(State(state): SharedState) -> Json<RootResponse> {
    let state = state.read().await;
    let ledger = state.ledger.read().await;

    Json(RootResponse {
        root: to_fixed_hex(&ledger.last_root()),
        next_index: ledger.next_index(),
    })
}

#[derive(Deserialize)]
pub struct IssueRequest {
    pub sender: Address,
    #[serde(with = "serde_fr")]
    pub commitment: Fr,
}

#[derive(Serialize)]
pub struct IssueResponse {
    pub index: u64,
    pub root: String,
}

pub async fn issue(State(state): SharedState, Json(req): Json<IssueRequest>) -> ApiResult<IssueResponse> {
    let state = state.read().await;
    let mut ledger = state.ledger.write().await;

    let index = ledger.issue(&req.sender, req.commitment)?;
    Ok(Json(IssueResponse {
        index,
        root: to_fixed_hex(&ledger.last_root()),
    }))
}

/// Accepts the field names of `ApproveCallData` as well.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub sender: Address,
    #[serde(alias = "_proof", with = "hex_bytes")]
    pub proof: Vec<u8>,
    #[serde(alias = "_root", with = "serde_fr")]
    pub root: Fr,
    #[serde(alias = "_nullifierHash", with = "serde_fr")]
    pub nullifier_hash: Fr,
}

pub async fn approve(
    State(state): SharedState,
    Json(req): Json<ApproveRequest>,
) -> ApiResult<NullifierStatus> {
    let state = state.read().await;
    let mut ledger = state.ledger.write().await;

    ledger.approve(&req.sender, &req.proof, req.root, req.nullifier_hash)?;
    Ok(Json(ledger.status(&req.nullifier_hash)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub sender: Address,
    #[serde(with = "serde_fr")]
    pub nullifier_hash: Fr,
    pub reason: String,
}

pub async fn revoke(
    State(state): SharedState,
    Json(req): Json<RevokeRequest>,
) -> ApiResult<NullifierStatus> {
    let state = state.read().await;
    let mut ledger = state.ledger.write().await;

    ledger.revoke(&req.sender, req.nullifier_hash, &req.reason)?;
    Ok(Json(ledger.status(&req.nullifier_hash)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsIssuedRequest {
    #[serde(with = "serde_fr_vec")]
    pub nullifier_hashes: Vec<Fr>,
}

#[derive(Serialize)]
pub struct IsIssuedResponse {
    pub issued: Vec<bool>,
}

pub async fn is_issued(
    State(state): SharedState,
    Json(req): Json<IsIssuedRequest>,
) -> Json<IsIssuedResponse> {
    let state = state.read().await;
    let ledger = state.ledger.read().await;

    Json(IsIssuedResponse {
        issued: ledger.is_issued_batch(&req.nullifier_hashes),
    })
}

// ============ Registry Mirror ============

#[derive(Deserialize)]
pub struct MerkleProofRequest {
    #[serde(with = "serde_fr")]
    pub commitment: Fr,
}

pub async fn merkle_proof(
    State(state): SharedState,
    Json(req): Json<MerkleProofRequest>,
) -> ApiResult<MerkleProof> {
    let state = state.read().await;
    let proof = generate_merkle_proof(
        &state.ledger,
        state.ctx.hasher().clone(),
        &state.config.tree,
        &req.commitment,
    )
    .await?;
    Ok(Json(proof))
}

#[derive(Deserialize)]
pub struct MultiProofRequest {
    #[serde(with = "serde_fr_vec")]
    pub commitments: Vec<Fr>,
}

#[derive(Serialize)]
pub struct MultiProofResponse {
    #[serde(with = "serde_fr")]
    pub root: Fr,
    #[serde(flatten)]
    pub proof: MultiProof,
}

pub async fn merkle_multi_proof(
    State(state): SharedState,
    Json(req): Json<MultiProofRequest>,
) -> ApiResult<MultiProofResponse> {
    let state = state.read().await;
    let (root, proof) = generate_multi_proof(
        &state.ledger,
        state.ctx.hasher().clone(),
        &state.config.tree,
        &req.commitments,
    )
    .await?;
    Ok(Json(MultiProofResponse { root, proof }))
}

// ============ Utilities ============

/// Shape an approve-circuit output into contract call arguments.
pub async fn approve_calldata(Json(output): Json<ProofOutput>) -> ApiResult<ApproveCallData> {
    Ok(Json(ApproveCallData::from_output(&output)?))
}

pub async fn create_direct_credential(State(state): SharedState) -> ApiResult<DirectCredential> {
    let state = state.read().await;
    let mut rng = ark_std::rand::thread_rng();
    Ok(Json(DirectCredential::random(&state.ctx, &mut rng)?))
}

#[derive(Deserialize)]
pub struct DocumentRequest {
    pub fields: BTreeMap<String, FieldValue>,
}

#[derive(Serialize)]
pub struct DocumentLeafResponse {
    pub key: String,
    #[serde(with = "serde_fr")]
    pub salt: Fr,
    #[serde(with = "serde_fr")]
    pub hash: Fr,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    #[serde(with = "serde_fr")]
    pub root: Fr,
    pub height: usize,
    pub leaves: Vec<DocumentLeafResponse>,
}

/// Salt a document's fields and commit to them at the configured height.
pub async fn create_document(
    State(state): SharedState,
    Json(req): Json<DocumentRequest>,
) -> ApiResult<DocumentResponse> {
    let state = state.read().await;
    let mut rng = ark_std::rand::thread_rng();
    let document = DocumentTree::build(
        &req.fields,
        state.ctx.hasher().clone(),
        state.config.document.height,
        &mut rng,
    )
    .map_err(NotaryError::from)?;

    Ok(Json(DocumentResponse {
        root: document.root(),
        height: document.height(),
        leaves: document
            .leaves()
            .iter()
            .map(|leaf| DocumentLeafResponse {
                key: leaf.key.clone(),
                salt: leaf.salt,
                hash: leaf.hash,
            })
            .collect(),
    }))
}

// ============ Proving ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveIssueRequest {
    pub credential: Credential,
    pub signature: Signature,
    pub public_key: PublicKey,
}

/// Check the holder's signature, then run the issue prover.
pub async fn prove_issue(
    State(state): SharedState,
    Json(req): Json<ProveIssueRequest>,
) -> ApiResult<ProofOutput> {
    let (ctx, engine, timeout) = {
        let state = state.read().await;
        (state.ctx.clone(), state.issue_prover.clone(), state.config.prover.timeout())
    };

    let inputs = prepare_issue_inputs(&ctx, &req.credential, &req.signature, &req.public_key)?;
    let engine = engine.ok_or_else(|| NotaryError::ProverUnavailable("issue".to_string()))?;
    let output = prove_with_timeout(engine, inputs, timeout).await?;

    info!(commitment = %to_fixed_hex(&req.credential.commitment()), "issue proof generated");
    Ok(Json(output))
}

#[derive(Deserialize)]
pub struct ProveApproveRequest {
    pub recipient: Address,
    pub credential: Credential,
}

/// Prove approval against the local ledger's tree, bound to `recipient`.
pub async fn prove_approve(
    State(state): SharedState,
    Json(req): Json<ProveApproveRequest>,
) -> ApiResult<ApproveCallData> {
    let (ctx, ledger, tree, engine, timeout) = {
        let state = state.read().await;
        (
            state.ctx.clone(),
            state.ledger.clone(),
            state.config.tree.clone(),
            state.approve_prover.clone(),
            state.config.prover.timeout(),
        )
    };
    let engine = engine.ok_or_else(|| NotaryError::ProverUnavailable("approve".to_string()))?;

    let output = generate_approve_proof_from_registry(
        &ledger,
        &ctx,
        &tree,
        engine,
        &req.recipient,
        &req.credential,
        timeout,
    )
    .await?;
    Ok(Json(ApproveCallData::from_output(&output)?))
}
