//! API route definitions for the notary ledger and proof helpers.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;

use crate::handlers;
use crate::AppState;

/// Create API routes
pub fn api_routes() -> Router<Arc<RwLock<AppState>>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Reference ledger
        .route("/api/notary/root", get(handlers::root))
        .route("/api/notary/issue", post(handlers::issue))
        .route("/api/notary/approve", post(handlers::approve))
        .route("/api/notary/revoke", post(handlers::revoke))
        .route("/api/notary/is-issued", post(handlers::is_issued))
        // Registry mirror
        .route("/api/merkle/proof", post(handlers::merkle_proof))
        .route("/api/merkle/multi-proof", post(handlers::merkle_multi_proof))
        // Utility endpoints
        .route("/api/calldata/approve", post(handlers::approve_calldata))
        .route("/api/credential/direct", post(handlers::create_direct_credential))
        .route("/api/credential/document", post(handlers::create_document))
        // Proving
        .route("/api/prove/issue", post(handlers::prove_issue))
        .route("/api/prove/approve", post(handlers::prove_approve))
}
