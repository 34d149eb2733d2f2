//! Proxy re-encryption primitives for KMSChain
//!
//! This module provides a single-hop, single-proxy key encapsulation scheme
//! over Ristretto255:
//!
//! - **Identity**: a [`PrivateKey`] scalar and its [`PublicKey`] point
//! - **Encapsulation**: a [`Capsule`] carries a fresh [`SymmetricKey`] to a
//!   public key. The payload itself is sealed by an external AEAD layer with
//!   that key; the engine never touches payload bytes.
//! - **Delegation**: a [`ReEncryptionKey`] from A to B lets a proxy turn a
//!   capsule for A into one only B can open, without the proxy learning the
//!   symmetric key or either private key
//!
//! # Security Model
//!
//! ## Capsule Integrity
//! Every capsule carries a non-interactive proof binding its two ephemeral
//! points. Proxies refuse capsules that fail it and decapsulation fails
//! closed with [`PreError::Integrity`] rather than returning a key.
//!
//! ## Delegation
//! Re-encryption keys are blinded with a Diffie-Hellman value between a fresh
//! precursor and the delegatee's public key, and signed by the delegator. A
//! transformed capsule carries a Chaum-Pedersen proof that the proxy applied
//! that exact key, which the delegatee checks before opening it.
//!
//! ## Limits
//! A delegatee colluding with the proxy can combine the re-encryption key with
//! the blinding factor and recover the delegator's private key. Delegate only
//! to parties trusted not to collude with the proxy.
//!
//! ## Secrets
//! [`PrivateKey`], [`SymmetricKey`] and [`ReEncryptionKey`] are zeroized on
//! drop and can be wiped early with `wipe()` or `Zeroize::zeroize`; a wiped value
//! returns [`PreError::Wiped`].

mod capsule;
mod codec;
mod curve;
mod error;
mod keys;
mod random;
mod reencrypt;
mod rekey;
mod signature;
mod symmetric;

pub use capsule::{Capsule, CAPSULE_SIZE, REENCRYPTED_CAPSULE_SIZE};
pub use codec::{WireType, CODEC_VERSION, HEADER_SIZE};
pub use curve::{POINT_SIZE, SCALAR_SIZE, SYMMETRIC_KEY_SIZE};
pub use error::{PreError, PreResult};
pub use keys::{
    KeyPair, PrivateKey, PublicKey, PRIVATE_KEY_PEM_TAG, PRIVATE_KEY_SIZE, PUBLIC_KEY_PEM_TAG,
    PUBLIC_KEY_SIZE,
};
pub use random::{OsRandom, RandomSource, OS_RANDOM_ATTEMPTS};
pub use reencrypt::{reencrypt, reencrypt_with, CORRECTNESS_PROOF_SIZE};
pub use rekey::{ReEncryptionKey, REENCRYPTION_KEY_SIZE};
pub use signature::SIGNATURE_SIZE;
pub use symmetric::SymmetricKey;

/// Identify the kind of a codec encoding from its header
pub fn wire_type(bytes: &[u8]) -> PreResult<WireType> {
    codec::peek_header(bytes)
}
