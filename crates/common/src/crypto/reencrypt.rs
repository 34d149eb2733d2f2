//! Proxy re-encryption
//!
//! The proxy raises both capsule points to the re-encryption key scalar and
//! attaches a Chaum-Pedersen proof that the same scalar was used for `E'`,
//! `V'` and the delegator-signed commitment `U'`. The delegatee can then check
//! that the proxy applied the key it was given rather than some other value.
//!
//! ```text
//! E' = rk·E    V' = rk·V
//! E2 = t·E     V2 = t·V     U2 = t·U
//! h  = H(E, E', E2, V, V', V2, U, U', U2, pk_B, X)
//! z3 = t + h·rk
//! ```

use curve25519_dalek::scalar::Scalar;
use zeroize::Zeroize;

use super::capsule::{Capsule, ReEncryption};
use super::codec::{Reader, Writer};
use super::curve::{self, dst, Point, POINT_SIZE, SCALAR_SIZE};
use super::error::{PreError, PreResult};
use super::keys::PublicKey;
use super::random::{self, OsRandom, RandomSource};
use super::rekey::ReEncryptionKey;

/// Size of an encoded correctness proof: `E2 || V2 || U2 || z3`
pub const CORRECTNESS_PROOF_SIZE: usize = 3 * POINT_SIZE + SCALAR_SIZE;

/// Proof that `E'`, `V'` and `U'` share one discrete log relative to `E`, `V`, `U`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CorrectnessProof {
    point_e2: Point,
    point_v2: Point,
    point_u2: Point,
    response: Scalar,
}

/// Points the correctness challenge is computed over
struct Statement<'a> {
    point_e: &'a Point,
    point_e1: &'a Point,
    point_v: &'a Point,
    point_v1: &'a Point,
    commitment: &'a Point,
    receiving: &'a PublicKey,
    precursor: &'a Point,
}

impl Statement<'_> {
    fn challenge(&self, point_e2: &Point, point_v2: &Point, point_u2: &Point) -> Scalar {
        curve::hash_to_scalar(
            dst::CORRECTNESS,
            &[
                &curve::point_to_bytes(self.point_e),
                &curve::point_to_bytes(self.point_e1),
                &curve::point_to_bytes(point_e2),
                &curve::point_to_bytes(self.point_v),
                &curve::point_to_bytes(self.point_v1),
                &curve::point_to_bytes(point_v2),
                &curve::point_to_bytes(curve::generator_u()),
                &curve::point_to_bytes(self.commitment),
                &curve::point_to_bytes(point_u2),
                self.receiving.as_point_bytes(),
                &curve::point_to_bytes(self.precursor),
            ],
        )
    }
}

impl CorrectnessProof {
    fn prove<R: RandomSource + ?Sized>(
        statement: &Statement<'_>,
        scalar: &Scalar,
        rng: &mut R,
    ) -> PreResult<Self> {
        let mut nonce = random::nonzero_scalar(rng)?;
        let point_e2 = nonce * statement.point_e;
        let point_v2 = nonce * statement.point_v;
        let point_u2 = nonce * curve::generator_u();
        let h = statement.challenge(&point_e2, &point_v2, &point_u2);
        let response = nonce + h * scalar;
        nonce.zeroize();
        Ok(Self {
            point_e2,
            point_v2,
            point_u2,
            response,
        })
    }

    fn check(&self, statement: &Statement<'_>) -> bool {
        let h = statement.challenge(&self.point_e2, &self.point_v2, &self.point_u2);
        self.response * statement.point_e == self.point_e2 + h * statement.point_e1
            && self.response * statement.point_v == self.point_v2 + h * statement.point_v1
            && self.response * curve::generator_u() == self.point_u2 + h * statement.commitment
    }

    /// Check the proof carried by a re-encrypted capsule
    pub(crate) fn verify(&self, capsule: &Capsule, re: &ReEncryption) -> bool {
        self.check(&Statement {
            point_e: capsule.point_e(),
            point_e1: &re.point_e1,
            point_v: capsule.point_v(),
            point_v1: &re.point_v1,
            commitment: &re.commitment,
            receiving: &re.receiving,
            precursor: &re.precursor,
        })
    }

    pub(crate) fn write<const N: usize>(&self, writer: Writer<N>) -> Writer<N> {
        writer
            .point(&self.point_e2)
            .point(&self.point_v2)
            .point(&self.point_u2)
            .scalar(&self.response)
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> PreResult<Self> {
        Ok(Self {
            point_e2: reader.point()?,
            point_v2: reader.point()?,
            point_u2: reader.point()?,
            response: reader.scalar()?,
        })
    }
}

/// Transform a capsule for the delegatee of `rkey` using the OS CSPRNG
pub fn reencrypt(capsule: &Capsule, rkey: &ReEncryptionKey) -> PreResult<Capsule> {
    reencrypt_with(capsule, rkey, &mut OsRandom)
}

/// Transform a capsule for the delegatee of `rkey`
///
/// # Errors
///
/// - [`PreError::InvalidCapsule`] if the capsule fails its proof check or was
///   already re-encrypted
/// - [`PreError::Wiped`] if the re-encryption key was wiped
/// - [`PreError::Validation`] if the re-encryption key does not verify
pub fn reencrypt_with<R: RandomSource + ?Sized>(
    capsule: &Capsule,
    rkey: &ReEncryptionKey,
    rng: &mut R,
) -> PreResult<Capsule> {
    if capsule.is_reencrypted() {
        return Err(PreError::invalid_capsule(
            "capsule was already re-encrypted, keys are single-hop",
        ));
    }
    if !capsule.verify() {
        tracing::warn!("refusing to re-encrypt capsule: proof check failed");
        return Err(PreError::invalid_capsule("capsule proof check failed"));
    }
    let scalar = rkey.scalar()?;
    if !rkey.verify() {
        return Err(PreError::validation(
            "re-encryption key signature check failed",
        ));
    }

    let point_e1 = scalar * capsule.point_e();
    let point_v1 = scalar * capsule.point_v();
    let statement = Statement {
        point_e: capsule.point_e(),
        point_e1: &point_e1,
        point_v: capsule.point_v(),
        point_v1: &point_v1,
        commitment: rkey.commitment(),
        receiving: rkey.receiving_key(),
        precursor: rkey.precursor(),
    };
    let proof = CorrectnessProof::prove(&statement, scalar, rng)?;

    tracing::debug!(
        delegating = %rkey.delegating_key(),
        receiving = %rkey.receiving_key(),
        "re-encrypted capsule"
    );
    Ok(capsule.reencrypted(ReEncryption {
        point_e1,
        point_v1,
        precursor: *rkey.precursor(),
        commitment: *rkey.commitment(),
        delegating: *rkey.delegating_key(),
        receiving: *rkey.receiving_key(),
        delegation: *rkey.signature(),
        proof,
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::keys::KeyPair;

    #[test]
    fn test_reencrypt_and_decapsulate() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let (capsule, key) = Capsule::encapsulate(&alice.public).unwrap();
        let rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();

        let transformed = reencrypt(&capsule, &rkey).unwrap();
        assert!(transformed.is_reencrypted());
        assert!(transformed.verify());
        assert!(transformed.verify_for(&bob.public));
        assert!(!transformed.verify_for(&alice.public));
        assert_eq!(transformed.delegating_key(), Some(&alice.public));
        assert_eq!(transformed.receiving_key(), Some(&bob.public));

        let recovered = transformed.decapsulate(&bob.private).unwrap();
        assert_eq!(key, recovered);
    }

    #[test]
    fn test_delegator_cannot_open_transformed_capsule() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&alice.public).unwrap();
        let rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();
        let transformed = reencrypt(&capsule, &rkey).unwrap();

        assert_eq!(
            transformed.decapsulate(&alice.private),
            Err(PreError::Integrity)
        );
    }

    #[test]
    fn test_single_hop() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let carol = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&alice.public).unwrap();
        let alice_to_bob = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();
        let bob_to_carol = ReEncryptionKey::derive(&bob.private, &carol.public).unwrap();

        let transformed = reencrypt(&capsule, &alice_to_bob).unwrap();
        assert!(matches!(
            reencrypt(&transformed, &bob_to_carol),
            Err(PreError::InvalidCapsule(_))
        ));
    }

    #[test]
    fn test_forged_proof_is_detected() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&alice.public).unwrap();
        let rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();
        let transformed = reencrypt(&capsule, &rkey).unwrap();

        let mut bytes = transformed.to_bytes();
        // low byte of z3
        let offset = bytes.len() - SCALAR_SIZE;
        bytes[offset] ^= 0x01;
        let forged = Capsule::from_bytes(&bytes).unwrap();
        assert!(!forged.verify());
        assert_eq!(forged.decapsulate(&bob.private), Err(PreError::Integrity));
    }

    #[test]
    fn test_wiped_key_refused() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&alice.public).unwrap();
        let mut rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();
        rkey.wipe();

        assert_eq!(reencrypt(&capsule, &rkey), Err(PreError::Wiped));
    }
}
