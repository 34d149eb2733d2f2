//! Shared test utilities for engine integration tests
#![allow(dead_code)]

use common::crypto::{Capsule, KeyPair, ReEncryptionKey, SymmetricKey};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic random source for reproducible scenarios
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Alice encapsulates to herself and delegates to Bob
pub struct Delegation {
    pub alice: KeyPair,
    pub bob: KeyPair,
    pub capsule: Capsule,
    pub key: SymmetricKey,
    pub rkey: ReEncryptionKey,
}

/// Set up a delegation from fresh OS randomness
pub fn setup_delegation() -> Delegation {
    let alice = KeyPair::generate().unwrap();
    let bob = KeyPair::generate().unwrap();
    let (capsule, key) = Capsule::encapsulate(&alice.public).unwrap();
    let rkey = ReEncryptionKey::derive(&alice.private, &bob.public).unwrap();
    Delegation {
        alice,
        bob,
        capsule,
        key,
        rkey,
    }
}

/// Set up a delegation where every random draw comes from `seed`
pub fn setup_seeded_delegation(seed: u64) -> Delegation {
    let mut rng = seeded(seed);
    let alice = KeyPair::generate_with(&mut rng).unwrap();
    let bob = KeyPair::generate_with(&mut rng).unwrap();
    let (capsule, key) = Capsule::encapsulate_with(&alice.public, &mut rng).unwrap();
    let rkey = ReEncryptionKey::derive_with(&alice.private, &bob.public, &mut rng).unwrap();
    Delegation {
        alice,
        bob,
        capsule,
        key,
        rkey,
    }
}

/// Flip the low bit of every byte in turn
pub fn bit_flips(bytes: &[u8]) -> impl Iterator<Item = (usize, Vec<u8>)> + '_ {
    (0..bytes.len()).map(move |i| {
        let mut flipped = bytes.to_vec();
        flipped[i] ^= 0x01;
        (i, flipped)
    })
}
