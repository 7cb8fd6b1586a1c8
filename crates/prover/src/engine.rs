//! Proving-engine seam.
//!
//! The circuits and their keys are external: an engine turns a
//! `CircuitInputs` map into proof bytes plus public signals, and a verifier
//! owns a verification key and checks such pairs.

use std::sync::Arc;
use std::time::Duration;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use notary_merkle::field::serde_fr_vec;

use crate::error::NotaryError;
use crate::inputs::CircuitInputs;

/// A proof together with the public signals it commits to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOutput {
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,
    #[serde(with = "serde_fr_vec")]
    pub public_signals: Vec<Fr>,
}

/// Produces proofs for one circuit.
pub trait ProvingEngine: Send + Sync {
    fn full_prove(&self, inputs: &CircuitInputs) -> Result<ProofOutput, NotaryError>;
}

/// Checks proofs for one circuit. Malformed proof bytes verify as false.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, public_signals: &[Fr], proof: &[u8]) -> bool;
}

/// Run the engine on a blocking worker, giving up after `timeout`.
///
/// Any failure, including the timeout, is reported as `ProverFailure` and can
/// be retried with the same inputs. Nothing else is touched, so an abandoned
/// run leaves tree and nullifier state as it was.
///
/// A blocking task cannot be cancelled. After a timeout the worker thread
/// keeps proving until the engine returns and its output is dropped, so a
/// burst of timed-out requests can still hold every blocking thread busy.
pub async fn prove_with_timeout(
    engine: Arc<dyn ProvingEngine>,
    inputs: CircuitInputs,
    timeout: Duration,
) -> Result<ProofOutput, NotaryError> {
    let task = tokio::task::spawn_blocking(move || engine.full_prove(&inputs));

    match tokio::time::timeout(timeout, task).await {
        Err(_) => {
            warn!(?timeout, "proof generation timed out");
            Err(NotaryError::ProverFailure(format!(
                "timed out after {:?}",
                timeout
            )))
        }
        Ok(Err(join_error)) => Err(NotaryError::ProverFailure(join_error.to_string())),
        Ok(Ok(Err(NotaryError::ProverFailure(message)))) => Err(NotaryError::ProverFailure(message)),
        Ok(Ok(Err(other))) => Err(NotaryError::ProverFailure(other.to_string())),
        Ok(Ok(Ok(output))) => {
            info!(signals = output.public_signals.len(), "proof generated");
            Ok(output)
        }
    }
}

/// Serde adapter for `0x`-prefixed hex byte strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
