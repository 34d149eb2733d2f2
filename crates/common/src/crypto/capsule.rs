//! Capsule key encapsulation
//!
//! A capsule carries an ephemeral symmetric key to the holder of a private key
//! without carrying the key itself. It is built from two ephemeral points and a
//! proof scalar:
//!
//! ```text
//! E = r·G    V = u·G    s = u + r·H(E, V)
//! K = KDF((r + u)·pk)
//! ```
//!
//! Anyone can check `s·G == V + H(E, V)·E`, which stops a proxy from being fed a
//! forged or mauled capsule. The owner of `sk` recomputes `K = KDF(sk·(E + V))`.
//!
//! After a proxy transforms a capsule (see [`super::reencrypt`]) it additionally
//! carries `E' = rk·E`, `V' = rk·V`, the delegation precursor `X`, and the
//! material the delegatee needs to check the transform was honest. The
//! delegatee recomputes the blinding factor `d = H(X, pk_B, sk_B·X)` and gets
//! `K = KDF(d·(E' + V'))`.

use std::fmt;

use curve25519_dalek::scalar::Scalar;

use super::codec::{self, impl_serde_bytes, Encode, Reader, WireType, Writer, HEADER_SIZE};
use super::curve::{self, dst, Point, POINT_SIZE, SCALAR_SIZE};
use super::error::{PreError, PreResult};
use super::keys::{PrivateKey, PublicKey};
use super::reencrypt::{CorrectnessProof, CORRECTNESS_PROOF_SIZE};
use super::rekey;
use super::random::{self, OsRandom, RandomSource};
use super::signature::{Signature, SIGNATURE_SIZE};
use super::symmetric::SymmetricKey;

/// Size of an encoded original capsule: `header || E || V || s`
pub const CAPSULE_SIZE: usize = HEADER_SIZE + 2 * POINT_SIZE + SCALAR_SIZE;
/// Size of an encoded re-encrypted capsule
///
/// Layout: `header || E || V || s || E' || V' || X || U' || pk_A || pk_B || signature || proof`
pub const REENCRYPTED_CAPSULE_SIZE: usize =
    CAPSULE_SIZE + 6 * POINT_SIZE + SIGNATURE_SIZE + CORRECTNESS_PROOF_SIZE;

/// The parts a proxy adds when transforming a capsule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReEncryption {
    pub(crate) point_e1: Point,
    pub(crate) point_v1: Point,
    pub(crate) precursor: Point,
    pub(crate) commitment: Point,
    pub(crate) delegating: PublicKey,
    pub(crate) receiving: PublicKey,
    pub(crate) delegation: Signature,
    pub(crate) proof: CorrectnessProof,
}

/// An encapsulated symmetric key
///
/// Capsules are immutable: re-encryption produces a new capsule.
///
/// # Wire Format
///
/// ```text
/// original:     [ 0x01 ][ 0x03 ][ E: 32 ][ V: 32 ][ s: 32 ]                         98 bytes
/// re-encrypted: [ 0x01 ][ 0x04 ][ E ][ V ][ s ][ E' ][ V' ][ X ][ U' ]
///               [ pk_A ][ pk_B ][ signature: 64 ][ proof: 128 ]                      482 bytes
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Capsule {
    point_e: Point,
    point_v: Point,
    proof: Scalar,
    reencryption: Option<ReEncryption>,
}

impl Capsule {
    /// Encapsulate a fresh symmetric key to `recipient` using the OS CSPRNG
    pub fn encapsulate(recipient: &PublicKey) -> PreResult<(Self, SymmetricKey)> {
        Self::encapsulate_with(recipient, &mut OsRandom)
    }

    /// Encapsulate a fresh symmetric key to `recipient`
    ///
    /// Returns the capsule to store next to the payload and the symmetric key
    /// for the AEAD layer. Fails only when the random source does.
    pub fn encapsulate_with<R: RandomSource + ?Sized>(
        recipient: &PublicKey,
        rng: &mut R,
    ) -> PreResult<(Self, SymmetricKey)> {
        let r = random::nonzero_scalar(rng)?;
        let u = random::nonzero_scalar(rng)?;

        let point_e = curve::mul_base(&r);
        let point_v = curve::mul_base(&u);
        let h = capsule_challenge(&point_e, &point_v);
        let proof = u + r * h;

        let shared = (r + u) * recipient.point();
        let key = SymmetricKey::new(curve::kdf(&shared));

        tracing::debug!(recipient = %recipient, "encapsulated symmetric key");
        Ok((
            Self {
                point_e,
                point_v,
                proof,
                reencryption: None,
            },
            key,
        ))
    }

    pub(crate) fn reencrypted(&self, reencryption: ReEncryption) -> Self {
        Self {
            reencryption: Some(reencryption),
            ..*self
        }
    }

    pub(crate) fn point_e(&self) -> &Point {
        &self.point_e
    }

    pub(crate) fn point_v(&self) -> &Point {
        &self.point_v
    }

    /// Whether this capsule was produced by a proxy transform
    pub fn is_reencrypted(&self) -> bool {
        self.reencryption.is_some()
    }

    /// The delegator's public key, for re-encrypted capsules
    pub fn delegating_key(&self) -> Option<&PublicKey> {
        self.reencryption.as_ref().map(|re| &re.delegating)
    }

    /// The delegatee's public key, for re-encrypted capsules
    pub fn receiving_key(&self) -> Option<&PublicKey> {
        self.reencryption.as_ref().map(|re| &re.receiving)
    }

    /// Check the capsule's proofs
    ///
    /// For an original capsule this is `s·G == V + H(E, V)·E` with `E` and `V`
    /// not the identity. A re-encrypted capsule must also carry a valid
    /// delegation signature and a valid proof that `E'` and `V'` were computed
    /// with the delegated key.
    pub fn verify(&self) -> bool {
        // the identity passes the equation for any proof and opens to a public key
        if curve::is_identity(&self.point_e) || curve::is_identity(&self.point_v) {
            return false;
        }
        let h = capsule_challenge(&self.point_e, &self.point_v);
        if curve::mul_base(&self.proof) != self.point_v + h * self.point_e {
            return false;
        }
        match &self.reencryption {
            None => true,
            Some(re) => {
                if curve::is_identity(&re.point_e1)
                    || curve::is_identity(&re.point_v1)
                    || curve::is_identity(&re.precursor)
                {
                    return false;
                }
                let message = rekey::delegation_message(
                    &re.commitment,
                    &re.precursor,
                    &re.delegating,
                    &re.receiving,
                );
                re.delegation
                    .verify(&re.delegating, &rekey::message_parts(&message))
                    && re.proof.verify(self, re)
            }
        }
    }

    /// Check the capsule's proofs against the key expected to open it
    ///
    /// A re-encrypted capsule only verifies for the delegatee it was
    /// transformed for.
    pub fn verify_for(&self, public_key: &PublicKey) -> bool {
        match &self.reencryption {
            Some(re) if re.receiving != *public_key => false,
            _ => self.verify(),
        }
    }

    /// Recover the symmetric key with `private_key`
    ///
    /// # Errors
    ///
    /// - [`PreError::Integrity`] if the capsule does not verify; no key
    ///   material is derived in that case
    /// - [`PreError::Wiped`] if the private key was wiped
    pub fn decapsulate(&self, private_key: &PrivateKey) -> PreResult<SymmetricKey> {
        let secret = private_key.scalar()?;
        match &self.reencryption {
            None => {
                if !self.verify() {
                    tracing::warn!("refusing to open capsule: proof check failed");
                    return Err(PreError::Integrity);
                }
                let shared = secret * (self.point_e + self.point_v);
                Ok(SymmetricKey::new(curve::kdf(&shared)))
            }
            Some(re) => {
                let public_key = private_key.public_key()?;
                if !self.verify_for(&public_key) {
                    tracing::warn!(
                        receiver = %public_key,
                        "refusing to open re-encrypted capsule: verification failed"
                    );
                    return Err(PreError::Integrity);
                }
                let dh = secret * re.precursor;
                let d = rekey::blinding_factor(&re.precursor, &public_key, &dh);
                let shared = d * (re.point_e1 + re.point_v1);
                Ok(SymmetricKey::new(curve::kdf(&shared)))
            }
        }
    }

    /// Encode the capsule
    ///
    /// Original capsules encode to [`CAPSULE_SIZE`] bytes, re-encrypted ones to
    /// [`REENCRYPTED_CAPSULE_SIZE`] bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.reencryption {
            None => Writer::<CAPSULE_SIZE>::new(WireType::Capsule)
                .point(&self.point_e)
                .point(&self.point_v)
                .scalar(&self.proof)
                .finish()
                .to_vec(),
            Some(re) => {
                let writer = Writer::<REENCRYPTED_CAPSULE_SIZE>::new(WireType::ReEncryptedCapsule)
                    .point(&self.point_e)
                    .point(&self.point_v)
                    .scalar(&self.proof)
                    .point(&re.point_e1)
                    .point(&re.point_v1)
                    .point(&re.precursor)
                    .point(&re.commitment)
                    .bytes(re.delegating.as_point_bytes())
                    .bytes(re.receiving.as_point_bytes())
                    .point(&re.delegation.commitment)
                    .scalar(&re.delegation.response);
                re.proof.write(writer).finish().to_vec()
            }
        }
    }

    /// Decode a capsule
    ///
    /// Validates every point and scalar encoding and rejects the identity
    /// wherever a key or capsule point belongs. Proofs are not checked here;
    /// call [`Capsule::verify`] (decapsulation and re-encryption do).
    pub fn from_bytes(bytes: &[u8]) -> PreResult<Self> {
        match codec::peek_header(bytes)? {
            WireType::Capsule => {
                let mut reader = Reader::new(bytes, WireType::Capsule, CAPSULE_SIZE)?;
                Ok(Self {
                    point_e: reader.nonidentity_point()?,
                    point_v: reader.nonidentity_point()?,
                    proof: reader.scalar()?,
                    reencryption: None,
                })
            }
            WireType::ReEncryptedCapsule => {
                let mut reader = Reader::new(
                    bytes,
                    WireType::ReEncryptedCapsule,
                    REENCRYPTED_CAPSULE_SIZE,
                )?;
                let point_e = reader.nonidentity_point()?;
                let point_v = reader.nonidentity_point()?;
                let proof = reader.scalar()?;
                let reencryption = ReEncryption {
                    point_e1: reader.nonidentity_point()?,
                    point_v1: reader.nonidentity_point()?,
                    precursor: reader.nonidentity_point()?,
                    commitment: reader.nonidentity_point()?,
                    delegating: PublicKey::from_point(reader.nonidentity_point()?),
                    receiving: PublicKey::from_point(reader.nonidentity_point()?),
                    delegation: Signature {
                        commitment: reader.point()?,
                        response: reader.scalar()?,
                    },
                    proof: CorrectnessProof::read(&mut reader)?,
                };
                debug_assert_eq!(reader.remaining(), 0);
                Ok(Self {
                    point_e,
                    point_v,
                    proof,
                    reencryption: Some(reencryption),
                })
            }
            other => Err(PreError::validation(format!(
                "expected a capsule encoding, got {other:?}"
            ))),
        }
    }

    /// Parse a capsule from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> PreResult<Self> {
        Self::from_bytes(&codec::decode_hex(hex)?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Debug for Capsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capsule")
            .field("e", &hex::encode(curve::point_to_bytes(&self.point_e)))
            .field("v", &hex::encode(curve::point_to_bytes(&self.point_v)))
            .field("reencrypted", &self.is_reencrypted())
            .finish()
    }
}

impl TryFrom<&[u8]> for Capsule {
    type Error = PreError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl Encode for Capsule {
    fn encode(&self) -> PreResult<Vec<u8>> {
        Ok(self.to_bytes())
    }
}

impl_serde_bytes!(Capsule, "a KMSChain capsule encoding");

fn capsule_challenge(point_e: &Point, point_v: &Point) -> Scalar {
    curve::hash_to_scalar(
        dst::CAPSULE,
        &[
            &curve::point_to_bytes(point_e),
            &curve::point_to_bytes(point_v),
        ],
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::keys::KeyPair;

    #[test]
    fn test_encapsulate_decapsulate() {
        let keypair = KeyPair::generate().unwrap();
        let (capsule, key) = Capsule::encapsulate(&keypair.public).unwrap();

        assert!(capsule.verify());
        assert!(capsule.verify_for(&keypair.public));
        assert!(!capsule.is_reencrypted());

        let recovered = capsule.decapsulate(&keypair.private).unwrap();
        assert_eq!(key, recovered);
    }

    #[test]
    fn test_capsules_are_randomized() {
        let keypair = KeyPair::generate().unwrap();
        let (first, first_key) = Capsule::encapsulate(&keypair.public).unwrap();
        let (second, second_key) = Capsule::encapsulate(&keypair.public).unwrap();
        assert_ne!(first, second);
        assert_ne!(first_key, second_key);
    }

    #[test]
    fn test_wrong_key_gets_different_symmetric_key() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let (capsule, key) = Capsule::encapsulate(&alice.public).unwrap();
        let wrong = capsule.decapsulate(&bob.private).unwrap();
        assert_ne!(key, wrong);
    }

    #[test]
    fn test_tampered_proof_fails_closed() {
        let keypair = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&keypair.public).unwrap();
        let forged = Capsule {
            proof: capsule.proof + Scalar::ONE,
            ..capsule
        };
        assert!(!forged.verify());
        assert_eq!(
            forged.decapsulate(&keypair.private),
            Err(PreError::Integrity)
        );
    }

    #[test]
    fn test_swapped_points_fail_verification() {
        let keypair = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&keypair.public).unwrap();
        let swapped = Capsule {
            point_e: capsule.point_v,
            point_v: capsule.point_e,
            ..capsule
        };
        assert!(!swapped.verify());
    }

    #[test]
    fn test_identity_capsule_fails_closed() {
        use curve25519_dalek::traits::Identity;

        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let rkey = alice.private.generate_rekey(&bob.public).unwrap();
        let identity = Capsule {
            point_e: Point::identity(),
            point_v: Point::identity(),
            proof: Scalar::ZERO,
            reencryption: None,
        };

        assert!(!identity.verify());
        assert_eq!(
            identity.decapsulate(&alice.private),
            Err(PreError::Integrity)
        );
        assert!(matches!(
            rkey.reencrypt(&identity),
            Err(PreError::InvalidCapsule(_))
        ));
    }

    #[test]
    fn test_wiped_key_cannot_decapsulate() {
        let mut keypair = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&keypair.public).unwrap();
        keypair.private.wipe();
        assert_eq!(
            capsule.decapsulate(&keypair.private),
            Err(PreError::Wiped)
        );
    }

    #[test]
    fn test_capsule_byte_roundtrip() {
        let keypair = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&keypair.public).unwrap();
        let bytes = capsule.to_bytes();
        assert_eq!(bytes.len(), CAPSULE_SIZE);
        let decoded = Capsule::from_bytes(&bytes).unwrap();
        assert_eq!(capsule, decoded);
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn test_capsule_rejects_other_wire_types() {
        let keypair = KeyPair::generate().unwrap();
        assert!(Capsule::from_bytes(&keypair.public.to_bytes()).is_err());
    }
}
