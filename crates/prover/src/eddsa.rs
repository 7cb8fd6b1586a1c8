//! EdDSA over Baby Jubjub with a Poseidon challenge, interoperable with
//! circomlib's `EdDSAPoseidonVerifier` and circomlibjs `verifyPoseidon`.
//!
//! Keys and signatures travel in circom coordinates, on the curve
//! `168700·x² + y² = 1 + 168696·x²·y²`. The arithmetic runs on
//! `ark-ed-on-bn254`, which uses the isomorphic `a = 1` form, so x is scaled
//! by `sqrt(168700)` going in and divided by it coming out.

use ark_bn254::Fr;
use ark_ec::{AffineRepr, CurveGroup, Group};
use ark_ed_on_bn254::{EdwardsAffine, Fr as SubgroupScalar};
use ark_ff::{BigInteger, Field, MontFp, PrimeField};
use tracing::debug;

use notary_merkle::{CircomPoseidon, FieldHasher};

use crate::context::{PublicKey, Signature, SignatureVerifier};
use crate::error::NotaryError;

/// Secret signing scalar, reduced modulo the prime subgroup order.
pub type SecretScalar = SubgroupScalar;

const CIRCOM_A: u64 = 168700;

/// Generator of the prime-order subgroup, in circom coordinates.
pub const BASE8_X: Fr =
    MontFp!("5299619240641551281634865583518297030282874472190772894086521144482721001553");
pub const BASE8_Y: Fr =
    MontFp!("16950150798460657717958625567821834550301663161624707787222815936182638968203");

fn x_scale() -> Option<Fr> {
    Fr::from(CIRCOM_A).sqrt()
}

/// Map a circom point onto the arkworks curve. `None` if it is off the curve.
fn from_circom(x: Fr, y: Fr) -> Option<EdwardsAffine> {
    let point = EdwardsAffine::new_unchecked(x * x_scale()?, y);
    point.is_on_curve().then_some(point)
}

fn to_circom(point: &EdwardsAffine) -> Option<(Fr, Fr)> {
    let inverse = x_scale()?.inverse()?;
    Some((point.x * inverse, point.y))
}

fn base8() -> Option<EdwardsAffine> {
    from_circom(BASE8_X, BASE8_Y)
}

fn convert<A: PrimeField, B: PrimeField>(value: A) -> B {
    B::from_le_bytes_mod_order(&value.into_bigint().to_bytes_le())
}

fn challenge(r8_x: Fr, r8_y: Fr, public_key: &PublicKey, message: Fr) -> Result<Fr, NotaryError> {
    Ok(CircomPoseidon.hash(&[r8_x, r8_y, public_key.x, public_key.y, message])?)
}

fn curve_error() -> NotaryError {
    NotaryError::InvalidSignature("Baby Jubjub point off curve".to_string())
}

/// EdDSA-Poseidon verifier over a single field element.
#[derive(Clone, Copy, Debug, Default)]
pub struct EddsaPoseidon;

impl EddsaPoseidon {
    /// `S·B8 == R8 + 8·H(R8, A, M)·A`, with `S` below the subgroup order.
    fn check(message: Fr, signature: &Signature, public_key: &PublicKey) -> Option<bool> {
        let s = signature.s.into_bigint();
        if s >= SubgroupScalar::MODULUS {
            debug!("signature scalar out of range");
            return Some(false);
        }

        let base8 = base8()?;
        let r8 = from_circom(signature.r8_x, signature.r8_y)?;
        let a = from_circom(public_key.x, public_key.y)?;
        let hm = challenge(signature.r8_x, signature.r8_y, public_key, message).ok()?;

        // hm is taken as an integer, not reduced modulo the subgroup order
        let left = base8.mul_bigint(s);
        let right = r8.into_group() + a.mul_bigint(hm.into_bigint()).mul_bigint([8u64]);
        Some(left == right)
    }
}

impl SignatureVerifier for EddsaPoseidon {
    fn verify(&self, message: Fr, signature: &Signature, public_key: &PublicKey) -> bool {
        match Self::check(message, signature, public_key) {
            Some(valid) => valid,
            None => {
                debug!("signature point off curve");
                false
            }
        }
    }
}

/// Public key `A = secret·B8` in circom coordinates.
pub fn public_key(secret: &SecretScalar) -> Result<PublicKey, NotaryError> {
    let base8 = base8().ok_or_else(curve_error)?;
    let (x, y) = to_circom(&(base8 * secret).into_affine()).ok_or_else(curve_error)?;
    Ok(PublicKey { x, y })
}

/// Sign `message` with a nonce derived from the secret and the message.
pub fn sign(secret: &SecretScalar, message: Fr) -> Result<Signature, NotaryError> {
    let base8 = base8().ok_or_else(curve_error)?;
    let public_key = public_key(secret)?;

    let nonce: SecretScalar = convert(CircomPoseidon.hash(&[convert(*secret), message])?);
    let (r8_x, r8_y) = to_circom(&(base8 * nonce).into_affine()).ok_or_else(curve_error)?;

    let hm: SecretScalar = convert(challenge(r8_x, r8_y, &public_key, message)?);
    let s = nonce + hm * SecretScalar::from(8u64) * secret;

    Ok(Signature {
        r8_x,
        r8_y,
        s: convert(s),
    })
}
