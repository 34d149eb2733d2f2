//! Operation-level facade over the engine
//!
//! [`KmsChain`] bundles a random source with the full set of operations so an
//! application can hold one handle and never touch group arithmetic directly.
//!
//! ```
//! use common::kmschain::KmsChain;
//!
//! let chain = KmsChain::new();
//! let alice = chain.generate_keys().unwrap();
//! let bob = chain.generate_keys().unwrap();
//!
//! let (capsule, key) = chain.encapsulate(&alice.public).unwrap();
//! let rkey = chain.generate_rekey(&alice.private, &bob.public).unwrap();
//! let transformed = chain.reencrypt(&capsule, &rkey).unwrap();
//!
//! assert_eq!(chain.decapsulate(&bob.private, &transformed).unwrap(), key);
//! ```

use std::sync::Mutex;

use crate::crypto::{
    reencrypt_with, Capsule, KeyPair, OsRandom, PreError, PreResult, PrivateKey, PublicKey,
    RandomSource, ReEncryptionKey, SymmetricKey,
};

/// Engine handle owning the random source used by every randomized operation
///
/// The handle is `Send + Sync` whenever `R` is `Send`, so one instance can be
/// shared across threads; draws from the source are serialized.
#[derive(Debug, Default)]
pub struct KmsChain<R = OsRandom> {
    rng: Mutex<R>,
}

impl KmsChain<OsRandom> {
    /// A handle backed by the operating system CSPRNG
    pub fn new() -> Self {
        Self::with_random_source(OsRandom)
    }
}

impl<R: RandomSource> KmsChain<R> {
    pub fn with_random_source(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn draw<T>(&self, op: impl FnOnce(&mut R) -> PreResult<T>) -> PreResult<T> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| PreError::RandomSource("random source lock poisoned".to_string()))?;
        op(&mut *rng)
    }

    pub fn generate_keys(&self) -> PreResult<KeyPair> {
        self.draw(|rng| KeyPair::generate_with(rng))
    }

    /// Encapsulate a fresh symmetric key to `public_key`
    pub fn encapsulate(&self, public_key: &PublicKey) -> PreResult<(Capsule, SymmetricKey)> {
        self.draw(|rng| Capsule::encapsulate_with(public_key, rng))
    }

    /// Open an original or re-encrypted capsule
    pub fn decapsulate(
        &self,
        private_key: &PrivateKey,
        capsule: &Capsule,
    ) -> PreResult<SymmetricKey> {
        capsule.decapsulate(private_key)
    }

    /// Derive a re-encryption key delegating `delegating`'s capsules to `receiving`
    pub fn generate_rekey(
        &self,
        delegating: &PrivateKey,
        receiving: &PublicKey,
    ) -> PreResult<ReEncryptionKey> {
        self.draw(|rng| ReEncryptionKey::derive_with(delegating, receiving, rng))
    }

    /// Proxy transform of `capsule` under `rkey`
    pub fn reencrypt(&self, capsule: &Capsule, rkey: &ReEncryptionKey) -> PreResult<Capsule> {
        self.draw(|rng| reencrypt_with(capsule, rkey, rng))
    }

    pub fn capsule_from_bytes(&self, bytes: &[u8]) -> PreResult<Capsule> {
        Capsule::from_bytes(bytes)
    }

    pub fn private_key_from_bytes(&self, bytes: &[u8]) -> PreResult<PrivateKey> {
        PrivateKey::from_bytes(bytes)
    }

    pub fn public_key_from_bytes(&self, bytes: &[u8]) -> PreResult<PublicKey> {
        PublicKey::from_bytes(bytes)
    }

    pub fn reencryption_key_from_bytes(&self, bytes: &[u8]) -> PreResult<ReEncryptionKey> {
        ReEncryptionKey::from_bytes(bytes)
    }
}
