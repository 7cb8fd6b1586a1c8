//! Solidity calldata export and positional public-signal decoding.
//!
//! Calldata has the shape `0x<proof>,["0x<signal>",...]` with every signal
//! as 32-byte hex. Signals are positional, so each circuit gets a named,
//! versioned schema that pins their order and count.

use ark_bn254::Fr;
use serde::Serialize;

use notary_merkle::{parse_field, to_fixed_hex};

use crate::engine::ProofOutput;
use crate::error::NotaryError;

/// Named layout of a circuit's public signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalSchema {
    pub circuit: &'static str,
    pub version: u32,
    pub signals: &'static [&'static str],
}

/// Approve circuit, both credential schemes.
pub const APPROVE_V1: SignalSchema = SignalSchema {
    circuit: "approve",
    version: 1,
    signals: &["root", "nullifierHash", "recipient"],
};

/// Issue circuit for direct credentials.
pub const ISSUE_DIRECT_V1: SignalSchema = SignalSchema {
    circuit: "issue-direct",
    version: 1,
    signals: &["nullifierHash", "commitment", "publicKeyX", "publicKeyY"],
};

/// Issue circuit for subject-bound credentials.
pub const ISSUE_SUBJECT_BOUND_V1: SignalSchema = SignalSchema {
    circuit: "issue-subject-bound",
    version: 1,
    signals: &["commitment", "publicKeyX", "publicKeyY"],
};

impl SignalSchema {
    /// Map positional signals onto names, requiring the exact count.
    pub fn decode(&self, signals: &[Fr]) -> Result<NamedSignals, NotaryError> {
        if signals.len() != self.signals.len() {
            return Err(NotaryError::MalformedCalldata(format!(
                "{} v{} expects {} public signals, got {}",
                self.circuit,
                self.version,
                self.signals.len(),
                signals.len()
            )));
        }

        Ok(NamedSignals {
            schema: *self,
            values: signals.to_vec(),
        })
    }
}

/// Public signals decoded through a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedSignals {
    schema: SignalSchema,
    values: Vec<Fr>,
}

impl NamedSignals {
    pub fn schema(&self) -> &SignalSchema {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<Fr> {
        self.schema
            .signals
            .iter()
            .position(|&s| s == name)
            .map(|i| self.values[i])
    }

    pub fn require(&self, name: &str) -> Result<Fr, NotaryError> {
        self.get(name).ok_or_else(|| {
            NotaryError::MalformedCalldata(format!(
                "{} v{} has no signal {}",
                self.schema.circuit, self.schema.version, name
            ))
        })
    }

    pub fn values(&self) -> &[Fr] {
        &self.values
    }
}

/// Calldata split back into its proof and signals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedCallData {
    /// `0x`-prefixed proof hex, passed to the contract as-is
    pub proof: String,
    pub public_signals: Vec<Fr>,
}

/// Encode a proof and its signals as Solidity calldata.
pub fn export_calldata(proof: &[u8], public_signals: &[Fr]) -> String {
    let signals: Vec<String> = public_signals
        .iter()
        .map(|s| format!("\"{}\"", to_fixed_hex(s)))
        .collect();
    format!("0x{},[{}]", hex::encode(proof), signals.join(","))
}

/// Split calldata at the first comma into proof and signal array.
pub fn decode_calldata(calldata: &str) -> Result<DecodedCallData, NotaryError> {
    let (proof, rest) = calldata
        .trim()
        .split_once(',')
        .ok_or_else(|| NotaryError::MalformedCalldata("missing public signals".to_string()))?;

    let digits = proof
        .strip_prefix("0x")
        .ok_or_else(|| NotaryError::MalformedCalldata("proof is not 0x-prefixed".to_string()))?;
    if digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NotaryError::MalformedCalldata("proof is not whole hex bytes".to_string()));
    }

    let texts: Vec<String> = serde_json::from_str(rest)
        .map_err(|e| NotaryError::MalformedCalldata(format!("public signals: {}", e)))?;
    let public_signals = texts
        .iter()
        .map(|t| parse_field(t).map_err(|e| NotaryError::MalformedCalldata(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DecodedCallData {
        proof: proof.to_string(),
        public_signals,
    })
}

/// Export a prover output and decode it through `schema`.
pub fn prepare_call_data(
    output: &ProofOutput,
    schema: &SignalSchema,
) -> Result<(String, NamedSignals), NotaryError> {
    let decoded = decode_calldata(&export_calldata(&output.proof, &output.public_signals))?;
    let signals = schema.decode(&decoded.public_signals)?;
    Ok((decoded.proof, signals))
}

/// Arguments of the notary's `approve` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApproveCallData {
    #[serde(rename = "_proof")]
    pub proof: String,
    #[serde(rename = "_root")]
    pub root: String,
    #[serde(rename = "_nullifierHash")]
    pub nullifier_hash: String,
    #[serde(rename = "_subject")]
    pub recipient: String,
}

impl ApproveCallData {
    pub fn from_output(output: &ProofOutput) -> Result<Self, NotaryError> {
        let (proof, signals) = prepare_call_data(output, &APPROVE_V1)?;
        Ok(Self {
            proof,
            root: to_fixed_hex(&signals.require("root")?),
            nullifier_hash: to_fixed_hex(&signals.require("nullifierHash")?),
            recipient: to_fixed_hex(&signals.require("recipient")?),
        })
    }

    /// Proof bytes as submitted on-chain.
    pub fn proof_bytes(&self) -> Result<Vec<u8>, NotaryError> {
        hex::decode(self.proof.trim_start_matches("0x"))
            .map_err(|e| NotaryError::MalformedCalldata(e.to_string()))
    }
}
