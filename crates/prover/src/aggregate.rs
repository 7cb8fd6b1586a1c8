//! Inputs for aggregate circuits that reason over several credentials.
//!
//! An aggregate proof opens a batch of subject-bound credentials against the
//! certificate tree (the registry) and discloses chosen fields of each
//! credential's document tree. Scoring takes a weighted sum over disclosed
//! fields; the timeframe check bounds the spread of one timestamp field.

use ark_bn254::Fr;
use ark_ff::Zero;
use rayon::prelude::*;
use serde::Serialize;

use notary_merkle::field::serde_fr_vec;
use notary_merkle::{
    verify_multi_proof, DocumentTree, FieldHasher, IncrementalMerkleTree, MerkleProof,
};

use crate::credential::SubjectBoundCredential;
use crate::error::NotaryError;
use crate::inputs::CircuitInputs;

/// One credential's opening against the certificate tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertreeProofInput {
    #[serde(with = "serde_fr_vec")]
    pub path_certree_elements: Vec<Fr>,
    pub path_certree_indices: u64,
}

impl From<MerkleProof> for CertreeProofInput {
    fn from(proof: MerkleProof) -> Self {
        Self {
            path_certree_indices: proof.packed_indices(),
            path_certree_elements: proof.path_elements,
        }
    }
}

/// Certificate tree openings for every credential, in order.
pub fn prepare_certree_proof_inputs(
    certree: &IncrementalMerkleTree,
    credentials: &[SubjectBoundCredential],
) -> Result<Vec<CertreeProofInput>, NotaryError> {
    credentials
        .iter()
        .map(|c| -> Result<CertreeProofInput, NotaryError> {
            Ok(certree.proof(&c.commitment)?.into())
        })
        .collect()
}

/// Disclosed document fields for a batch of credentials.
///
/// Every per-document vector is padded to `2^height` slots: fields with
/// `[0, 0, 0]`, path elements and indices with `0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialFieldInputs {
    pub fields: Vec<Vec<[Fr; 3]>>,
    pub path_field_elements: Vec<Vec<Fr>>,
    pub field_indices: Vec<Vec<u64>>,
}

impl CredentialFieldInputs {
    pub fn into_inputs(self) -> CircuitInputs {
        CircuitInputs::new()
            .with("fields", self.fields)
            .with("pathFieldElements", self.path_field_elements)
            .with("fieldIndices", self.field_indices)
    }
}

/// Disclose `keys` from each document with one multi-proof per document.
///
/// Keys are sorted before use. Each multi-proof is verified against its
/// document root before it is accepted.
pub fn prepare_credential_field_inputs<S: AsRef<str> + Sync>(
    hasher: &dyn FieldHasher,
    documents: &[DocumentTree],
    keys: &[S],
) -> Result<CredentialFieldInputs, NotaryError> {
    let per_document = documents
        .par_iter()
        .map(|doc| disclose(hasher, doc, keys))
        .collect::<Result<Vec<_>, _>>()?;

    let mut inputs = CredentialFieldInputs {
        fields: Vec::with_capacity(per_document.len()),
        path_field_elements: Vec::with_capacity(per_document.len()),
        field_indices: Vec::with_capacity(per_document.len()),
    };
    for (fields, elements, indices) in per_document {
        inputs.fields.push(fields);
        inputs.path_field_elements.push(elements);
        inputs.field_indices.push(indices);
    }
    Ok(inputs)
}

type Disclosure = (Vec<[Fr; 3]>, Vec<Fr>, Vec<u64>);

fn disclose<S: AsRef<str>>(
    hasher: &dyn FieldHasher,
    doc: &DocumentTree,
    keys: &[S],
) -> Result<Disclosure, NotaryError> {
    let slots = 1usize << doc.height();
    let leaves = doc.disclosed(keys)?;
    let proof = doc.multi_proof(keys)?;
    let hashes: Vec<Fr> = leaves.iter().map(|leaf| leaf.hash).collect();

    if !verify_multi_proof(hasher, doc.height(), doc.root(), &hashes, &proof) {
        return Err(NotaryError::WitnessMismatch(
            "document multi-proof does not reproduce the document root".to_string(),
        ));
    }

    let padded = proof.padded(&hashes, doc.height())?;
    let mut fields: Vec<[Fr; 3]> = leaves.iter().map(|leaf| leaf.fields()).collect();
    fields.resize(slots, [Fr::zero(); 3]);

    Ok((fields, padded.path_elements, padded.leaf_indices))
}

/// Single-field disclosure per document, each with its own path proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldProofInputs {
    pub fields: Vec<[Fr; 3]>,
    pub path_field_elements: Vec<Vec<Fr>>,
    pub path_field_indices: Vec<u64>,
}

impl FieldProofInputs {
    pub fn into_inputs(self) -> CircuitInputs {
        CircuitInputs::new()
            .with("fields", self.fields)
            .with("pathFieldElements", self.path_field_elements)
            .with("pathFieldIndices", self.path_field_indices)
    }
}

/// Disclose one field (e.g. `timestamp`) from every document.
pub fn prepare_field_proof_inputs(
    hasher: &dyn FieldHasher,
    documents: &[DocumentTree],
    key: &str,
) -> Result<FieldProofInputs, NotaryError> {
    let mut inputs = FieldProofInputs {
        fields: Vec::with_capacity(documents.len()),
        path_field_elements: Vec::with_capacity(documents.len()),
        path_field_indices: Vec::with_capacity(documents.len()),
    };

    for doc in documents {
        let leaf = doc
            .find_leaf(key)
            .ok_or_else(|| notary_merkle::TreeError::LeafNotFound(key.to_string()))?;
        let proof = doc.proof(key)?;
        if !proof.verify(hasher) {
            return Err(NotaryError::WitnessMismatch(format!(
                "proof for field {} does not reproduce the document root",
                key
            )));
        }

        inputs.fields.push(leaf.fields());
        inputs.path_field_indices.push(proof.packed_indices());
        inputs.path_field_elements.push(proof.path_elements);
    }
    Ok(inputs)
}

fn credential_inputs(
    certree: &IncrementalMerkleTree,
    credentials: &[SubjectBoundCredential],
) -> Result<CircuitInputs, NotaryError> {
    let cert_proofs = prepare_certree_proof_inputs(certree, credentials)?;

    Ok(CircuitInputs::new()
        .with("certreeRoot", certree.root())
        .with(
            "nullifierHashes",
            credentials.iter().map(|c| c.nullifier_hash).collect::<Vec<_>>(),
        )
        .with("credentialRoots", credentials.iter().map(|c| c.root).collect::<Vec<_>>())
        .with("subjects", credentials.iter().map(|c| c.subject).collect::<Vec<_>>())
        .with("secrets", credentials.iter().map(|c| c.secret).collect::<Vec<_>>())
        .with(
            "pathCertreeElements",
            cert_proofs
                .iter()
                .map(|p| p.path_certree_elements.clone())
                .collect::<Vec<_>>(),
        )
        .with(
            "pathCertreeIndices",
            cert_proofs.iter().map(|p| p.path_certree_indices).collect::<Vec<_>>(),
        ))
}

/// Parameters of a weighted-score claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreClaim {
    pub required_tags: Vec<Fr>,
    pub weights: Vec<u64>,
    pub result: u64,
}

/// Full input set for the score circuit.
pub fn prepare_score_inputs(
    hasher: &dyn FieldHasher,
    certree: &IncrementalMerkleTree,
    credentials: &[SubjectBoundCredential],
    documents: &[DocumentTree],
    field_keys: &[&str],
    claim: &ScoreClaim,
) -> Result<CircuitInputs, NotaryError> {
    check_batch(credentials, documents)?;
    if claim.weights.len() != credentials.len() || claim.required_tags.len() != credentials.len() {
        return Err(NotaryError::WitnessMismatch(
            "one weight and one tag are needed per credential".to_string(),
        ));
    }

    let mut inputs = CircuitInputs::new()
        .with("certreeRoot", certree.root())
        .with("requiredTags", claim.required_tags.clone())
        .with("weights", claim.weights.clone())
        .with("result", claim.result);
    inputs.extend(credential_inputs(certree, credentials)?);
    inputs.extend(prepare_credential_field_inputs(hasher, documents, field_keys)?.into_inputs());
    Ok(inputs)
}

/// Parameters of a timeframe claim over one timestamp field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeframeClaim {
    pub field_key: String,
    pub period: u64,
    /// Comparison operator code understood by the circuit (5 is `<=`)
    pub operator: u64,
}

/// Full input set for the timeframe circuit.
pub fn prepare_timeframe_inputs(
    hasher: &dyn FieldHasher,
    certree: &IncrementalMerkleTree,
    credentials: &[SubjectBoundCredential],
    documents: &[DocumentTree],
    claim: &TimeframeClaim,
) -> Result<CircuitInputs, NotaryError> {
    check_batch(credentials, documents)?;

    let mut inputs = CircuitInputs::new()
        .with("certreeRoot", certree.root())
        .with("timestampFieldKey", notary_merkle::document::key_to_field(&claim.field_key))
        .with("period", claim.period)
        .with("operator", claim.operator);
    inputs.extend(credential_inputs(certree, credentials)?);
    inputs.extend(prepare_field_proof_inputs(hasher, documents, &claim.field_key)?.into_inputs());
    Ok(inputs)
}

fn check_batch(
    credentials: &[SubjectBoundCredential],
    documents: &[DocumentTree],
) -> Result<(), NotaryError> {
    if credentials.len() != documents.len() {
        return Err(NotaryError::WitnessMismatch(format!(
            "{} credentials but {} documents",
            credentials.len(),
            documents.len()
        )));
    }
    if let Some(c) = credentials
        .iter()
        .zip(documents)
        .find_map(|(c, d)| (c.root != d.root()).then_some(c))
    {
        return Err(NotaryError::WitnessMismatch(format!(
            "credential {} is not bound to its document",
            notary_merkle::to_fixed_hex(&c.commitment)
        )));
    }
    Ok(())
}
