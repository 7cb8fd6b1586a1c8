//! Field element conversions shared by every component.
//!
//! Byte buffers are read big-endian and reduced modulo the BN254 scalar field
//! order. Text accepts either `0x`-prefixed hex or plain decimal, and values at
//! or above the modulus are rejected rather than reduced.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, UniformRand};
use ark_std::rand::Rng;
use num_bigint::BigUint;

use crate::error::TreeError;

/// BN254 scalar field order in decimal.
pub const FIELD_SIZE: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// Interpret a big-endian byte buffer as a field element, reducing mod p.
pub fn bytes_to_field(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// Big-endian 32-byte encoding of a field element.
pub fn field_to_bytes(value: &Fr) -> [u8; 32] {
    let raw = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - raw.len()..].copy_from_slice(&raw);
    out
}

/// `0x`-prefixed, zero-padded 32-byte hex, as the contract ABI expects.
pub fn to_fixed_hex(value: &Fr) -> String {
    format!("0x{}", hex::encode(field_to_bytes(value)))
}

/// Plain decimal rendering, as circuit input files expect.
pub fn to_decimal(value: &Fr) -> String {
    BigUint::from_bytes_be(&field_to_bytes(value)).to_string()
}

/// The field modulus as a big integer.
pub fn modulus() -> BigUint {
    BigUint::from_bytes_be(&Fr::MODULUS.to_bytes_be())
}

/// Parse a canonical field element from hex (`0x...`) or decimal text.
pub fn parse_field(text: &str) -> Result<Fr, TreeError> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => BigUint::parse_bytes(digits.as_bytes(), 16),
        None => BigUint::parse_bytes(text.as_bytes(), 10),
    };
    let value = parsed.ok_or_else(|| TreeError::InvalidFieldElement(text.to_string()))?;

    if value >= modulus() {
        return Err(TreeError::InvalidFieldElement(format!(
            "{} is not below the field size",
            text
        )));
    }

    Ok(bytes_to_field(&value.to_bytes_be()))
}

/// Uniformly random field element, used for secrets, nullifiers and salts.
pub fn random_field<R: Rng + ?Sized>(rng: &mut R) -> Fr {
    Fr::rand(rng)
}

/// Serde adapter storing a field element as a decimal string.
pub mod serde_fr {
    use ark_bn254::Fr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_decimal(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_field(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter storing a list of field elements as decimal strings.
pub mod serde_fr_vec {
    use ark_bn254::Fr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[Fr], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(super::to_decimal))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Fr>, D::Error> {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .iter()
            .map(|text| super::parse_field(text).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Zero;

    #[test]
    fn test_hex_and_decimal_agree() {
        let from_hex = parse_field("0xff").unwrap();
        let from_dec = parse_field("255").unwrap();
        assert_eq!(from_hex, from_dec);
        assert_eq!(from_hex, Fr::from(255u64));
    }

    #[test]
    fn test_modulus_rejected_as_text() {
        assert!(matches!(
            parse_field(FIELD_SIZE),
            Err(TreeError::InvalidFieldElement(_))
        ));
        assert!(parse_field("not a number").is_err());
        assert!(parse_field("0x").is_err());
    }

    #[test]
    fn test_bytes_reduced_mod_p() {
        let p_bytes = modulus().to_bytes_be();
        assert!(bytes_to_field(&p_bytes).is_zero());

        let mut p_plus_one = modulus();
        p_plus_one += 1u32;
        assert_eq!(bytes_to_field(&p_plus_one.to_bytes_be()), Fr::from(1u64));
    }

    #[test]
    fn test_fixed_hex_is_padded() {
        let hex = to_fixed_hex(&Fr::from(1u64));
        assert_eq!(hex.len(), 66);
        assert!(hex.ends_with("01"));
        assert_eq!(parse_field(&hex).unwrap(), Fr::from(1u64));
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(to_decimal(&Fr::zero()), "0");
        assert_eq!(to_decimal(&Fr::from(123456789u64)), "123456789");
        let minus_one = -Fr::from(1u64);
        let expected = modulus() - 1u32;
        assert_eq!(to_decimal(&minus_one), expected.to_string());
    }
}
