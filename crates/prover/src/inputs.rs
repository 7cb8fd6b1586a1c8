//! Named, ordered circuit input vectors.
//!
//! Circuit input files are JSON objects whose leaves are decimal strings.
//! Order of insertion is kept so the same credential always serialises to
//! the same document.

use ark_bn254::Fr;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use notary_merkle::to_decimal;

use crate::error::NotaryError;

/// A scalar or a (nested) array of field elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputValue {
    Scalar(Fr),
    Array(Vec<InputValue>),
}

impl InputValue {
    /// All scalars, depth first.
    pub fn flatten(&self) -> Vec<Fr> {
        match self {
            InputValue::Scalar(v) => vec![*v],
            InputValue::Array(items) => items.iter().flat_map(InputValue::flatten).collect(),
        }
    }
}

impl From<Fr> for InputValue {
    fn from(value: Fr) -> Self {
        InputValue::Scalar(value)
    }
}

impl From<u64> for InputValue {
    fn from(value: u64) -> Self {
        InputValue::Scalar(Fr::from(value))
    }
}

impl<T: Into<InputValue>> From<Vec<T>> for InputValue {
    fn from(values: Vec<T>) -> Self {
        InputValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<const N: usize> From<[Fr; N]> for InputValue {
    fn from(values: [Fr; N]) -> Self {
        InputValue::Array(values.into_iter().map(InputValue::Scalar).collect())
    }
}

impl Serialize for InputValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InputValue::Scalar(v) => serializer.serialize_str(&to_decimal(v)),
            InputValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Input signals for one proving run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CircuitInputs {
    entries: Vec<(String, InputValue)>,
}

impl CircuitInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<InputValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a named input, keeping its original position.
    pub fn insert(&mut self, name: &str, value: impl Into<InputValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Append every entry of `other`.
    pub fn extend(&mut self, other: CircuitInputs) {
        for (name, value) in other.entries {
            self.insert(&name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// A required scalar input.
    pub fn scalar(&self, name: &str) -> Result<Fr, NotaryError> {
        match self.get(name) {
            Some(InputValue::Scalar(v)) => Ok(*v),
            Some(InputValue::Array(_)) => Err(NotaryError::WitnessMismatch(format!(
                "input {} is an array",
                name
            ))),
            None => Err(NotaryError::WitnessMismatch(format!("missing input {}", name))),
        }
    }

    /// A required input flattened to scalars.
    pub fn flattened(&self, name: &str) -> Result<Vec<Fr>, NotaryError> {
        self.get(name)
            .map(InputValue::flatten)
            .ok_or_else(|| NotaryError::WitnessMismatch(format!("missing input {}", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, NotaryError> {
        serde_json::to_string(self).map_err(|e| NotaryError::Serialization(e.to_string()))
    }
}

impl Serialize for CircuitInputs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
