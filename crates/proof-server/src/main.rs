//! HTTP API server for the private credential notary.
//!
//! Hosts a local reference ledger and exposes the registry mirror, calldata
//! shaping and credential helpers over JSON.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod handlers;
mod routes;

use notary_prover::{
    CryptoContext, Groth16Verifier, MemoryLedger, NotaryConfig, ProvingEngine, SharedLedger,
};

/// Name of the approve circuit's key files in the keys directory
const APPROVE_CIRCUIT: &str = "approve";

/// Application state shared across handlers
pub struct AppState {
    pub config: NotaryConfig,
    pub ctx: CryptoContext,
    pub ledger: SharedLedger,
    /// Engines for the issue and approve circuits, when one is installed
    pub issue_prover: Option<Arc<dyn ProvingEngine>>,
    pub approve_prover: Option<Arc<dyn ProvingEngine>>,
}

impl AppState {
    pub fn new(config: NotaryConfig) -> Result<Self> {
        let ctx = CryptoContext::circom();
        let mut ledger = MemoryLedger::new(&config.tree, ctx.hasher().clone(), config.server.multisig)
            .context("failed to create ledger")?;

        let keys_dir = &config.prover.keys_dir;
        if keys_dir.join(format!("{}.vk", APPROVE_CIRCUIT)).exists() {
            let verifier = Groth16Verifier::load(keys_dir, APPROVE_CIRCUIT)
                .with_context(|| format!("failed to load verifying key from {:?}", keys_dir))?;
            ledger = ledger.with_verifier(Arc::new(verifier));
            info!(?keys_dir, "approve verifying key loaded");
        } else {
            warn!(?keys_dir, "no approve verifying key, approvals are disabled");
        }

        Ok(Self {
            config,
            ctx,
            ledger: SharedLedger::new(ledger),
            issue_prover: None,
            approve_prover: None,
        })
    }

    pub fn with_issue_prover(mut self, engine: Arc<dyn ProvingEngine>) -> Self {
        self.issue_prover = Some(engine);
        self
    }

    pub fn with_approve_prover(mut self, engine: Arc<dyn ProvingEngine>) -> Self {
        self.approve_prover = Some(engine);
        self
    }
}

/// Build the router with CORS and request tracing.
pub fn app(state: Arc<RwLock<AppState>>) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

fn load_config() -> Result<NotaryConfig> {
    let mut config = match std::env::var("NOTARY_CONFIG") {
        Ok(path) => NotaryConfig::load_from_file(Path::new(&path))
            .with_context(|| format!("failed to load config from {}", path))?,
        Err(_) => NotaryConfig::default(),
    };
    config
        .apply_env()
        .context("invalid environment override")?;
    Ok(config)
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    info!("Starting credential notary server...");

    let config = load_config()?;
    info!(
        height = config.tree.height,
        zero = %config.tree.zero,
        document_height = config.document.height,
        prover_timeout = ?config.prover.timeout(),
        multisig = %config.server.multisig,
        "configuration loaded"
    );

    let bind = config.server.bind.clone();
    let state = Arc::new(RwLock::new(AppState::new(config)?));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    info!(%bind, "Listening");

    axum::serve(listener, app(state)).await?;
    Ok(())
}
