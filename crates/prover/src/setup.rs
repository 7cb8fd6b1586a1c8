//! Trusted setup and the Groth16 engine behind the proving seam.
//!
//! A `CircuitBuilder` knows how to turn named circuit inputs into an R1CS
//! instance. Keys are generated per circuit and stored as `<name>.pk` and
//! `<name>.vk` under the keys directory.

use std::path::Path;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintSynthesizer;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{ProofOutput, ProofVerifier, ProvingEngine};
use crate::error::NotaryError;
use crate::inputs::CircuitInputs;

/// Errors that can occur during setup
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Circuit setup failed: {0}")]
    CircuitSetup(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Deserialization failed: {0}")]
    Deserialization(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maps circuit inputs onto one R1CS circuit.
pub trait CircuitBuilder: Send + Sync {
    type Circuit: ConstraintSynthesizer<Fr>;

    /// File stem for this circuit's keys
    fn name(&self) -> &str;

    /// Instance without assignments, used for key generation
    fn blank(&self) -> Self::Circuit;

    /// Assigned instance plus its public signals in circuit order
    fn build(&self, inputs: &CircuitInputs) -> Result<(Self::Circuit, Vec<Fr>), NotaryError>;
}

/// Keys for a single circuit
#[derive(Clone)]
pub struct CircuitKeyPair {
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
}

impl CircuitKeyPair {
    /// Serialize proving key to bytes
    pub fn serialize_pk(&self) -> Result<Vec<u8>, SetupError> {
        let mut bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| SetupError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    /// Serialize verifying key to bytes
    pub fn serialize_vk(&self) -> Result<Vec<u8>, SetupError> {
        let mut bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| SetupError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    pub fn deserialize_pk(bytes: &[u8]) -> Result<ProvingKey<Bn254>, SetupError> {
        ProvingKey::deserialize_compressed(bytes)
            .map_err(|e| SetupError::Deserialization(e.to_string()))
    }

    pub fn deserialize_vk(bytes: &[u8]) -> Result<VerifyingKey<Bn254>, SetupError> {
        VerifyingKey::deserialize_compressed(bytes)
            .map_err(|e| SetupError::Deserialization(e.to_string()))
    }

    /// Write `<name>.pk` and `<name>.vk` into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path, name: &str) -> Result<(), SetupError> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(format!("{}.pk", name)), self.serialize_pk()?)?;
        std::fs::write(dir.join(format!("{}.vk", name)), self.serialize_vk()?)?;
        Ok(())
    }

    pub fn load(dir: &Path, name: &str) -> Result<Self, SetupError> {
        Ok(Self {
            proving_key: Self::deserialize_pk(&std::fs::read(dir.join(format!("{}.pk", name)))?)?,
            verifying_key: Self::load_vk(dir, name)?,
        })
    }

    /// Only the verifying key, for processes that never prove.
    pub fn load_vk(dir: &Path, name: &str) -> Result<VerifyingKey<Bn254>, SetupError> {
        Self::deserialize_vk(&std::fs::read(dir.join(format!("{}.vk", name)))?)
    }
}

/// Run circuit-specific setup for one builder.
pub fn setup_circuit<B, R>(builder: &B, rng: &mut R) -> Result<CircuitKeyPair, SetupError>
where
    B: CircuitBuilder,
    R: RngCore + CryptoRng,
{
    info!(circuit = builder.name(), "running trusted setup");
    let (proving_key, verifying_key) =
        Groth16::<Bn254>::circuit_specific_setup(builder.blank(), rng)
            .map_err(|e| SetupError::CircuitSetup(e.to_string()))?;

    Ok(CircuitKeyPair {
        proving_key,
        verifying_key,
    })
}

/// Groth16 prover for one circuit.
pub struct Groth16Prover<B> {
    builder: B,
    proving_key: ProvingKey<Bn254>,
}

impl<B: CircuitBuilder> Groth16Prover<B> {
    pub fn new(builder: B, proving_key: ProvingKey<Bn254>) -> Self {
        Self {
            builder,
            proving_key,
        }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }
}

impl<B: CircuitBuilder> ProvingEngine for Groth16Prover<B> {
    fn full_prove(&self, inputs: &CircuitInputs) -> Result<ProofOutput, NotaryError> {
        let (circuit, public_signals) = self.builder.build(inputs)?;

        let mut rng = rand::thread_rng();
        let proof = Groth16::<Bn254>::prove(&self.proving_key, circuit, &mut rng)
            .map_err(|e| NotaryError::ProverFailure(e.to_string()))?;

        let mut bytes = Vec::new();
        proof
            .serialize_compressed(&mut bytes)
            .map_err(|e| NotaryError::Serialization(e.to_string()))?;

        debug!(circuit = self.builder.name(), bytes = bytes.len(), "groth16 proof");
        Ok(ProofOutput {
            proof: bytes,
            public_signals,
        })
    }
}

/// Groth16 verifier holding a processed verifying key.
pub struct Groth16Verifier {
    pvk: PreparedVerifyingKey<Bn254>,
}

impl Groth16Verifier {
    pub fn from_vk(vk: &VerifyingKey<Bn254>) -> Result<Self, SetupError> {
        let pvk = Groth16::<Bn254>::process_vk(vk)
            .map_err(|e| SetupError::CircuitSetup(e.to_string()))?;
        Ok(Self { pvk })
    }

    pub fn load(dir: &Path, name: &str) -> Result<Self, SetupError> {
        Self::from_vk(&CircuitKeyPair::load_vk(dir, name)?)
    }
}

impl ProofVerifier for Groth16Verifier {
    fn verify(&self, public_signals: &[Fr], proof: &[u8]) -> bool {
        let proof = match Proof::<Bn254>::deserialize_compressed(proof) {
            Ok(proof) => proof,
            Err(e) => {
                warn!(error = %e, "rejecting undecodable proof");
                return false;
            }
        };

        match Groth16::<Bn254>::verify_with_processed_vk(&self.pvk, public_signals, &proof) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "proof verification failed");
                false
            }
        }
    }
}
