//! Ethereum account addresses as they enter circuit inputs.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use notary_merkle::bytes_to_field;

use crate::error::NotaryError;

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The address read as a big-endian integer, always below the field size.
    pub fn to_field(&self) -> Fr {
        bytes_to_field(&self.0)
    }
}

impl FromStr for Address {
    type Err = NotaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|_| NotaryError::InvalidAddress(s.to_string()))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| NotaryError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = NotaryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let text = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
        let address: Address = text.parse().unwrap();
        assert_eq!(address.to_string(), text);

        let bare: Address = "70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap();
        assert_eq!(bare, address);
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xgg997970c51812dc3a010c7d01b50e0d17dc79c8".parse::<Address>().is_err());
    }

    #[test]
    fn test_to_field_is_big_endian() {
        let mut bytes = [0u8; 20];
        bytes[18] = 0x01;
        bytes[19] = 0x02;
        assert_eq!(Address::from_bytes(bytes).to_field(), Fr::from(258u64));
    }
}
