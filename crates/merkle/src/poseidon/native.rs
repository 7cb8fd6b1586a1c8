//! Native Poseidon hash functions (outside circuits).

use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonHasher};

use crate::error::TreeError;

/// Largest input count covered by the circom parameter set.
pub const MAX_POSEIDON_INPUTS: usize = 12;

/// Hash a single field element.
pub fn poseidon_hash(input: Fr) -> Result<Fr, TreeError> {
    poseidon_hash_many(&[input])
}

/// Hash two field elements.
pub fn poseidon_hash_two(a: Fr, b: Fr) -> Result<Fr, TreeError> {
    poseidon_hash_many(&[a, b])
}

/// Hash 1 to 12 field elements with the width-matched circom parameters.
pub fn poseidon_hash_many(inputs: &[Fr]) -> Result<Fr, TreeError> {
    if inputs.is_empty() || inputs.len() > MAX_POSEIDON_INPUTS {
        return Err(TreeError::Hash(format!(
            "Poseidon takes 1 to {} inputs, got {}",
            MAX_POSEIDON_INPUTS,
            inputs.len()
        )));
    }

    let mut sponge =
        Poseidon::<Fr>::new_circom(inputs.len()).map_err(|e| TreeError::Hash(e.to_string()))?;
    sponge.hash(inputs).map_err(|e| TreeError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::parse_field;

    #[test]
    fn test_hash_deterministic() {
        let a = Fr::from(42u64);
        let b = Fr::from(123u64);

        let h1 = poseidon_hash_two(a, b).unwrap();
        let h2 = poseidon_hash_two(a, b).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_different_inputs() {
        let h1 = poseidon_hash_two(Fr::from(1u64), Fr::from(2u64)).unwrap();
        let h2 = poseidon_hash_two(Fr::from(1u64), Fr::from(3u64)).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_matches_circomlib_vector() {
        let expected = parse_field(
            "7853200120776062878684798364095072458815029376092732009249414926327459813530",
        )
        .unwrap();
        assert_eq!(
            poseidon_hash_two(Fr::from(1u64), Fr::from(2u64)).unwrap(),
            expected
        );
    }

    #[test]
    fn test_width_depends_on_arity() {
        let one = poseidon_hash(Fr::from(5u64)).unwrap();
        let padded = poseidon_hash_two(Fr::from(5u64), Fr::from(0u64)).unwrap();
        assert_ne!(one, padded);
    }

    #[test]
    fn test_arity_bounds() {
        assert!(matches!(poseidon_hash_many(&[]), Err(TreeError::Hash(_))));
        let too_many = vec![Fr::from(1u64); MAX_POSEIDON_INPUTS + 1];
        assert!(poseidon_hash_many(&too_many).is_err());
        let max = vec![Fr::from(1u64); MAX_POSEIDON_INPUTS];
        assert!(poseidon_hash_many(&max).is_ok());
    }
}
