//! Group arithmetic backend
//!
//! Everything that knows the engine runs over Ristretto255 lives here, so the
//! rest of the crate only deals in [`Scalar`]s, [`Point`]s and the helpers below.

use std::sync::OnceLock;

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use sha2::{Digest, Sha512};

use super::error::{PreError, PreResult};

pub(crate) type Point = RistrettoPoint;

/// Size of a canonical scalar encoding in bytes
pub const SCALAR_SIZE: usize = 32;
/// Size of a compressed point encoding in bytes
pub const POINT_SIZE: usize = 32;
/// Size of a derived symmetric key in bytes
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Domain separation tags, one per hash use
pub(crate) mod dst {
    pub const CAPSULE: &[u8] = b"KMSCHAIN-V1/capsule-proof";
    pub const DH: &[u8] = b"KMSCHAIN-V1/delegation-dh";
    pub const SIGNATURE: &[u8] = b"KMSCHAIN-V1/schnorr";
    pub const CORRECTNESS: &[u8] = b"KMSCHAIN-V1/correctness-proof";
    pub const GENERATOR_U: &[u8] = b"KMSCHAIN-V1/generator-u";
}

/// BLAKE3 context string for the capsule KDF
const KDF_CONTEXT: &str = "kmschain 2026-01 capsule symmetric key v1";

/// Basepoint multiplication
pub(crate) fn mul_base(scalar: &Scalar) -> Point {
    RistrettoPoint::mul_base(scalar)
}

/// Second generator with no known discrete log relative to the basepoint
pub(crate) fn generator_u() -> &'static Point {
    static U: OnceLock<Point> = OnceLock::new();
    U.get_or_init(|| {
        let mut digest = [0u8; 64];
        digest.copy_from_slice(&Sha512::digest(dst::GENERATOR_U));
        RistrettoPoint::from_uniform_bytes(&digest)
    })
}

/// Hash a domain tag and a list of encodings to a scalar
///
/// Each part is length-prefixed so distinct part lists never collide.
pub(crate) fn hash_to_scalar(tag: &[u8], parts: &[&[u8]]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update((tag.len() as u64).to_le_bytes());
    hasher.update(tag);
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let mut digest = [0u8; 64];
    digest.copy_from_slice(&hasher.finalize());
    Scalar::from_bytes_mod_order_wide(&digest)
}

/// Derive a symmetric key from a shared point
pub(crate) fn kdf(shared: &Point) -> [u8; SYMMETRIC_KEY_SIZE] {
    blake3::derive_key(KDF_CONTEXT, shared.compress().as_bytes())
}

pub(crate) fn point_to_bytes(point: &Point) -> [u8; POINT_SIZE] {
    point.compress().to_bytes()
}

pub(crate) fn point_from_bytes(bytes: &[u8]) -> PreResult<Point> {
    let compressed = CompressedRistretto::from_slice(bytes).map_err(|_| {
        PreError::validation(format!(
            "invalid point size, expected {}, got {}",
            POINT_SIZE,
            bytes.len()
        ))
    })?;
    compressed
        .decompress()
        .ok_or_else(|| PreError::validation("invalid point encoding"))
}

pub(crate) fn is_identity(point: &Point) -> bool {
    *point == RistrettoPoint::identity()
}

/// Decode a point that must not be the identity element
pub(crate) fn nonidentity_point_from_bytes(bytes: &[u8]) -> PreResult<Point> {
    let point = point_from_bytes(bytes)?;
    if is_identity(&point) {
        return Err(PreError::validation("point is the identity element"));
    }
    Ok(point)
}

pub(crate) fn scalar_from_bytes(bytes: &[u8]) -> PreResult<Scalar> {
    let array: [u8; SCALAR_SIZE] = bytes.try_into().map_err(|_| {
        PreError::validation(format!(
            "invalid scalar size, expected {}, got {}",
            SCALAR_SIZE,
            bytes.len()
        ))
    })?;
    Option::<Scalar>::from(Scalar::from_canonical_bytes(array))
        .ok_or_else(|| PreError::validation("scalar is not canonically encoded"))
}
