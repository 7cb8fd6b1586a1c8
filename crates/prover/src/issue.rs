//! Issue proof-input preparation.
//!
//! The issue circuit proves that a holder's key signed the credential
//! commitment. Inputs are only built once the signature checks out
//! natively, so a bad signature never reaches the prover.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use notary_merkle::to_fixed_hex;

use crate::context::{CryptoContext, PublicKey, Signature};
use crate::credential::{subject_of, Credential};
use crate::engine::{prove_with_timeout, ProofOutput, ProvingEngine};
use crate::error::NotaryError;
use crate::inputs::CircuitInputs;

/// Build the issue circuit inputs for `credential`.
///
/// Direct: `{nullifierHash, commitment, publicKey, nullifier, secret, signature}`.
/// Subject-bound: `{commitment, credentialRoot, publicKey, secret, signature}`.
pub fn prepare_issue_inputs(
    ctx: &CryptoContext,
    credential: &Credential,
    signature: &Signature,
    public_key: &PublicKey,
) -> Result<CircuitInputs, NotaryError> {
    let commitment = credential.commitment();
    if !ctx.verify_signature(commitment, signature, public_key) {
        return Err(NotaryError::InvalidSignature(to_fixed_hex(&commitment)));
    }

    let public_key_input = vec![public_key.x, public_key.y];
    let signature_input = vec![signature.r8_x, signature.r8_y, signature.s];

    let inputs = match credential {
        Credential::Direct(c) => CircuitInputs::new()
            .with("nullifierHash", c.nullifier_hash)
            .with("commitment", c.commitment)
            .with("publicKey", public_key_input)
            .with("nullifier", c.nullifier)
            .with("secret", c.secret)
            .with("signature", signature_input),
        Credential::SubjectBound(c) => {
            if subject_of(ctx, public_key)? != c.subject {
                return Err(NotaryError::WitnessMismatch(
                    "public key does not match credential subject".to_string(),
                ));
            }
            CircuitInputs::new()
                .with("commitment", c.commitment)
                .with("credentialRoot", c.root)
                .with("publicKey", public_key_input)
                .with("secret", c.secret)
                .with("signature", signature_input)
        }
    };

    debug!(commitment = %to_fixed_hex(&commitment), scheme = ?credential.scheme(), "prepared issue inputs");
    Ok(inputs)
}

/// Prepare inputs and run the issue prover.
pub async fn generate_issue_proof(
    ctx: &CryptoContext,
    engine: Arc<dyn ProvingEngine>,
    credential: &Credential,
    signature: &Signature,
    public_key: &PublicKey,
    timeout: Duration,
) -> Result<ProofOutput, NotaryError> {
    let inputs = prepare_issue_inputs(ctx, credential, signature, public_key)?;
    prove_with_timeout(engine, inputs, timeout).await
}
