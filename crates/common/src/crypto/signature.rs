//! Schnorr signatures over Ristretto255
//!
//! Used by delegators to authenticate the public parts of a re-encryption key,
//! so a delegatee can tell that a transformed capsule was produced with a key
//! the delegator actually issued.

use curve25519_dalek::scalar::Scalar;

use super::curve::{self, dst, Point, POINT_SIZE, SCALAR_SIZE};
use super::error::PreResult;
use super::keys::{PrivateKey, PublicKey};
use super::random::{self, RandomSource};

/// Size of an encoded signature in bytes
pub const SIGNATURE_SIZE: usize = POINT_SIZE + SCALAR_SIZE;

/// A Schnorr signature `(R, z)` with `z·G == R + c·pk`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Signature {
    pub(crate) commitment: Point,
    pub(crate) response: Scalar,
}

impl Signature {
    /// Sign a message given as a list of fixed encodings
    pub(crate) fn sign<R: RandomSource + ?Sized>(
        signer: &PrivateKey,
        message: &[&[u8]],
        rng: &mut R,
    ) -> PreResult<Self> {
        let secret = signer.scalar()?;
        let public = signer.public_key()?;
        let nonce = random::nonzero_scalar(rng)?;
        let commitment = curve::mul_base(&nonce);
        let challenge = challenge(&commitment, &public, message);
        Ok(Self {
            commitment,
            response: nonce + challenge * secret,
        })
    }

    pub(crate) fn verify(&self, signer: &PublicKey, message: &[&[u8]]) -> bool {
        let challenge = challenge(&self.commitment, signer, message);
        curve::mul_base(&self.response) == self.commitment + challenge * signer.point()
    }
}

fn challenge(commitment: &Point, signer: &PublicKey, message: &[&[u8]]) -> Scalar {
    let commitment = curve::point_to_bytes(commitment);
    let mut parts: Vec<&[u8]> = Vec::with_capacity(message.len() + 2);
    parts.push(&commitment);
    parts.push(signer.as_point_bytes());
    parts.extend_from_slice(message);
    curve::hash_to_scalar(dst::SIGNATURE, &parts)
}
