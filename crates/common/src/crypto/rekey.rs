//! Re-encryption keys
//!
//! A delegator A hands a proxy a key that turns capsules for A into capsules
//! for a delegatee B. The key is blinded with a non-interactive Diffie-Hellman
//! value only B can recompute:
//!
//! ```text
//! X  = x·G                    fresh precursor
//! d  = H(X, pk_B, x·pk_B)     B recomputes with sk_B·X
//! rk = sk_A · d⁻¹
//! U' = rk·U                   commitment to rk over the second generator
//! ```
//!
//! A signs `(U', X, pk_A, pk_B)` so that proxies and delegatees can tell the
//! key was issued by A and was not altered in transit.
//!
//! Keys are single-hop: a capsule that already went through a proxy cannot be
//! transformed again.

use std::fmt;

use curve25519_dalek::scalar::Scalar;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::capsule::Capsule;
use super::codec::{self, impl_serde_bytes, Encode, Reader, WireType, Writer, HEADER_SIZE};
use super::curve::{self, dst, Point, POINT_SIZE, SCALAR_SIZE};
use super::error::{PreError, PreResult};
use super::keys::{PrivateKey, PublicKey};
use super::random::{self, OsRandom, RandomSource};
use super::reencrypt;
use super::signature::{Signature, SIGNATURE_SIZE};

/// Size of an encoded re-encryption key
///
/// Layout: `header || rk || X || U' || pk_A || pk_B || signature`
pub const REENCRYPTION_KEY_SIZE: usize = HEADER_SIZE + SCALAR_SIZE + 4 * POINT_SIZE + SIGNATURE_SIZE;

/// A delegation from one key pair to another, held by a proxy
///
/// The scalar part is secret from everyone but the proxy and is zeroized on
/// drop or on [`ReEncryptionKey::wipe`]. [`Zeroize::zeroize`] is the same as
/// `wipe`.
pub struct ReEncryptionKey {
    scalar: Scalar,
    precursor: Point,
    commitment: Point,
    delegating: PublicKey,
    receiving: PublicKey,
    signature: Signature,
    wiped: bool,
}

impl ReEncryptionKey {
    /// Derive a re-encryption key from `delegating` to `receiving` using the OS CSPRNG
    pub fn derive(delegating: &PrivateKey, receiving: &PublicKey) -> PreResult<Self> {
        Self::derive_with(delegating, receiving, &mut OsRandom)
    }

    /// Derive a re-encryption key from `delegating` to `receiving`
    ///
    /// # Errors
    ///
    /// - [`PreError::Wiped`] if the delegating key was wiped
    /// - [`PreError::RandomSource`] if the random source fails
    pub fn derive_with<R: RandomSource + ?Sized>(
        delegating: &PrivateKey,
        receiving: &PublicKey,
        rng: &mut R,
    ) -> PreResult<Self> {
        let secret = delegating.scalar()?;
        let delegating_pk = delegating.public_key()?;

        // d is a hash output; redraw the precursor in the negligible case it is zero
        let (precursor, blinding) = loop {
            let mut x = random::nonzero_scalar(rng)?;
            let precursor = curve::mul_base(&x);
            let dh = x * receiving.point();
            x.zeroize();
            let blinding = blinding_factor(&precursor, receiving, &dh);
            if blinding != Scalar::ZERO {
                break (precursor, blinding);
            }
        };

        let scalar = secret * blinding.invert();
        let commitment = scalar * curve::generator_u();

        let message = delegation_message(&commitment, &precursor, &delegating_pk, receiving);
        let signature = Signature::sign(delegating, &message_parts(&message), rng)?;

        tracing::debug!(
            delegating = %delegating_pk,
            receiving = %receiving,
            "derived re-encryption key"
        );
        Ok(Self {
            scalar,
            precursor,
            commitment,
            delegating: delegating_pk,
            receiving: *receiving,
            signature,
            wiped: false,
        })
    }

    pub(crate) fn scalar(&self) -> PreResult<&Scalar> {
        if self.wiped {
            return Err(PreError::Wiped);
        }
        Ok(&self.scalar)
    }

    pub(crate) fn precursor(&self) -> &Point {
        &self.precursor
    }

    pub(crate) fn commitment(&self) -> &Point {
        &self.commitment
    }

    pub(crate) fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The delegator's public key
    pub fn delegating_key(&self) -> &PublicKey {
        &self.delegating
    }

    /// The delegatee's public key
    pub fn receiving_key(&self) -> &PublicKey {
        &self.receiving
    }

    /// Check the delegator's signature and that `U'` commits to the key scalar
    ///
    /// A wiped key never verifies.
    pub fn verify(&self) -> bool {
        if self.wiped {
            return false;
        }
        let message = delegation_message(
            &self.commitment,
            &self.precursor,
            &self.delegating,
            &self.receiving,
        );
        self.signature
            .verify(&self.delegating, &message_parts(&message))
            && self.scalar * curve::generator_u() == self.commitment
    }

    /// Transform a capsule for the delegatee using the OS CSPRNG
    ///
    /// Same as [`reencrypt::reencrypt`].
    pub fn reencrypt(&self, capsule: &Capsule) -> PreResult<Capsule> {
        reencrypt::reencrypt(capsule, self)
    }

    /// Zeroize the key scalar; later operations return [`PreError::Wiped`]
    pub fn wipe(&mut self) {
        self.scalar.zeroize();
        self.wiped = true;
    }

    pub fn is_wiped(&self) -> bool {
        self.wiped
    }

    pub fn to_bytes(&self) -> PreResult<[u8; REENCRYPTION_KEY_SIZE]> {
        let scalar = self.scalar()?;
        Ok(Writer::<REENCRYPTION_KEY_SIZE>::new(WireType::ReEncryptionKey)
            .scalar(scalar)
            .point(&self.precursor)
            .point(&self.commitment)
            .bytes(self.delegating.as_point_bytes())
            .bytes(self.receiving.as_point_bytes())
            .point(&self.signature.commitment)
            .scalar(&self.signature.response)
            .finish())
    }

    /// Decode a re-encryption key
    ///
    /// Rejects encodings whose signature or commitment does not check out, so
    /// a decoded key is always one its delegator issued.
    pub fn from_bytes(bytes: &[u8]) -> PreResult<Self> {
        let mut reader = Reader::new(bytes, WireType::ReEncryptionKey, REENCRYPTION_KEY_SIZE)?;
        let scalar = reader.scalar()?;
        if scalar == Scalar::ZERO {
            return Err(PreError::validation("re-encryption key scalar is zero"));
        }
        let precursor = reader.nonidentity_point()?;
        let commitment = reader.nonidentity_point()?;
        let delegating = PublicKey::from_point(reader.nonidentity_point()?);
        let receiving = PublicKey::from_point(reader.nonidentity_point()?);
        let signature = Signature {
            commitment: reader.point()?,
            response: reader.scalar()?,
        };
        debug_assert_eq!(reader.remaining(), 0);

        let key = Self {
            scalar,
            precursor,
            commitment,
            delegating,
            receiving,
            signature,
            wiped: false,
        };
        if !key.verify() {
            return Err(PreError::validation(
                "re-encryption key signature check failed",
            ));
        }
        Ok(key)
    }

    /// Parse a re-encryption key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> PreResult<Self> {
        Self::from_bytes(&codec::decode_hex(hex)?)
    }

    pub fn to_hex(&self) -> PreResult<String> {
        let mut bytes = self.to_bytes()?;
        let hex = hex::encode(bytes);
        bytes.zeroize();
        Ok(hex)
    }
}

impl Zeroize for ReEncryptionKey {
    fn zeroize(&mut self) {
        self.wipe();
    }
}

impl Drop for ReEncryptionKey {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl ZeroizeOnDrop for ReEncryptionKey {}

impl PartialEq for ReEncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.wiped == other.wiped
            && bool::from(self.scalar.ct_eq(&other.scalar))
            && self.precursor == other.precursor
            && self.commitment == other.commitment
            && self.delegating == other.delegating
            && self.receiving == other.receiving
            && self.signature == other.signature
    }
}

impl Eq for ReEncryptionKey {}

impl fmt::Debug for ReEncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReEncryptionKey")
            .field("delegating", &self.delegating)
            .field("receiving", &self.receiving)
            .field("wiped", &self.wiped)
            .finish_non_exhaustive()
    }
}

impl TryFrom<&[u8]> for ReEncryptionKey {
    type Error = PreError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl Encode for ReEncryptionKey {
    fn encode(&self) -> PreResult<Vec<u8>> {
        let mut bytes = self.to_bytes()?;
        let out = bytes.to_vec();
        bytes.zeroize();
        Ok(out)
    }
}

impl_serde_bytes!(ReEncryptionKey, "a KMSChain re-encryption key encoding");

/// Blinding factor `d = H(X, pk_B, dh)` shared by delegator and delegatee
pub(crate) fn blinding_factor(precursor: &Point, receiving: &PublicKey, dh: &Point) -> Scalar {
    curve::hash_to_scalar(
        dst::DH,
        &[
            &curve::point_to_bytes(precursor),
            receiving.as_point_bytes(),
            &curve::point_to_bytes(dh),
        ],
    )
}

/// The fields the delegator signs: `U' || X || pk_A || pk_B`
pub(crate) fn delegation_message(
    commitment: &Point,
    precursor: &Point,
    delegating: &PublicKey,
    receiving: &PublicKey,
) -> [[u8; POINT_SIZE]; 4] {
    [
        curve::point_to_bytes(commitment),
        curve::point_to_bytes(precursor),
        *delegating.as_point_bytes(),
        *receiving.as_point_bytes(),
    ]
}

pub(crate) fn message_parts(message: &[[u8; POINT_SIZE]; 4]) -> [&[u8]; 4] {
    [&message[0], &message[1], &message[2], &message[3]]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::keys::KeyPair;

    #[test]
    fn test_derive_and_verify() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();

        assert!(rkey.verify());
        assert_eq!(rkey.delegating_key(), &alice.public);
        assert_eq!(rkey.receiving_key(), &bob.public);
    }

    #[test]
    fn test_byte_roundtrip() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();

        let bytes = rkey.to_bytes().unwrap();
        assert_eq!(bytes.len(), REENCRYPTION_KEY_SIZE);
        let decoded = ReEncryptionKey::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
        assert_eq!(decoded.receiving_key(), &bob.public);

        let hex = rkey.to_hex().unwrap();
        let from_hex = ReEncryptionKey::from_hex(&format!("0x{hex}")).unwrap();
        assert_eq!(from_hex.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_swapped_receiver_fails_signature() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let eve = KeyPair::generate().unwrap();
        let rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();

        let mut bytes = rkey.to_bytes().unwrap();
        let offset = HEADER_SIZE + SCALAR_SIZE + 3 * POINT_SIZE;
        bytes[offset..offset + POINT_SIZE].copy_from_slice(eve.public.as_point_bytes());
        assert!(ReEncryptionKey::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_altered_scalar_fails_commitment() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();

        let tampered = ReEncryptionKey {
            scalar: rkey.scalar + Scalar::ONE,
            precursor: rkey.precursor,
            commitment: rkey.commitment,
            delegating: rkey.delegating,
            receiving: rkey.receiving,
            signature: rkey.signature,
            wiped: false,
        };
        assert!(!tampered.verify());
        assert!(ReEncryptionKey::from_bytes(&tampered.to_bytes().unwrap()).is_err());
    }

    #[test]
    fn test_wipe() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let mut rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();

        rkey.wipe();
        rkey.wipe();
        assert!(rkey.is_wiped());
        assert!(!rkey.verify());
        assert_eq!(rkey.to_bytes(), Err(PreError::Wiped));
        assert_eq!(rkey.to_hex(), Err(PreError::Wiped));
    }

    #[test]
    fn test_zeroize_wipes() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&alice.public).unwrap();
        let mut rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();

        rkey.zeroize();
        assert!(rkey.is_wiped());
        assert_eq!(rkey.to_bytes(), Err(PreError::Wiped));
        assert_eq!(rkey.reencrypt(&capsule), Err(PreError::Wiped));
    }

    #[test]
    fn test_equality() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();
        let other = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();

        let decoded = ReEncryptionKey::from_bytes(&rkey.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, rkey);
        assert_ne!(other, rkey);
    }

    #[test]
    fn test_wiped_delegator_cannot_derive() {
        let mut alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        alice.private.wipe();
        assert!(matches!(
            ReEncryptionKey::derive(&alice.private, &bob.public),
            Err(PreError::Wiped)
        ));
    }
}
