//! Integration tests for secret wiping and concurrent use

mod common;

use std::sync::Arc;
use std::thread;

use ::common::crypto::{reencrypt, Capsule, KeyPair, PreError};
use ::common::kmschain::KmsChain;
use zeroize::Zeroize;

#[test]
fn test_wiped_values_are_unusable() {
    let mut d = common::setup_delegation();
    let transformed = reencrypt(&d.capsule, &d.rkey).unwrap();

    d.bob.private.wipe();
    d.bob.private.wipe();
    assert!(d.bob.private.is_wiped());
    assert_eq!(d.bob.private.public_key(), Err(PreError::Wiped));
    assert_eq!(d.bob.private.to_bytes(), Err(PreError::Wiped));
    assert_eq!(
        transformed.decapsulate(&d.bob.private),
        Err(PreError::Wiped)
    );
    assert!(matches!(
        d.bob.private.generate_rekey(&d.alice.public),
        Err(PreError::Wiped)
    ));

    d.rkey.wipe();
    d.rkey.wipe();
    assert!(d.rkey.is_wiped());
    assert_eq!(reencrypt(&d.capsule, &d.rkey), Err(PreError::Wiped));

    d.key.wipe();
    d.key.wipe();
    assert!(d.key.is_wiped());
    assert_eq!(d.key.as_bytes(), Err(PreError::Wiped));

    // the delegator is unaffected
    assert!(d.capsule.decapsulate(&d.alice.private).is_ok());
}

#[test]
fn test_zeroize_is_a_wipe() {
    let mut d = common::setup_delegation();
    let transformed = reencrypt(&d.capsule, &d.rkey).unwrap();

    d.bob.private.zeroize();
    assert!(d.bob.private.is_wiped());
    assert_eq!(
        transformed.decapsulate(&d.bob.private),
        Err(PreError::Wiped)
    );

    d.rkey.zeroize();
    assert!(d.rkey.is_wiped());
    assert_eq!(reencrypt(&d.capsule, &d.rkey), Err(PreError::Wiped));

    d.key.zeroize();
    assert!(d.key.is_wiped());
    assert_eq!(d.key.as_bytes(), Err(PreError::Wiped));
}

#[test]
fn test_shared_values_across_threads() {
    let d = Arc::new(common::setup_delegation());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let d = Arc::clone(&d);
            thread::spawn(move || {
                let transformed = reencrypt(&d.capsule, &d.rkey).unwrap();
                let key = transformed.decapsulate(&d.bob.private).unwrap();
                key == d.key
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_shared_handle_across_threads() {
    let chain = Arc::new(KmsChain::new());
    let recipient = chain.generate_keys().unwrap();
    let recipient = Arc::new(recipient);

    thread::scope(|scope| {
        for _ in 0..4 {
            let chain = Arc::clone(&chain);
            let recipient = Arc::clone(&recipient);
            scope.spawn(move || {
                let (capsule, key) = chain.encapsulate(&recipient.public).unwrap();
                let bytes = capsule.to_bytes();
                let decoded = Capsule::from_bytes(&bytes).unwrap();
                assert_eq!(chain.decapsulate(&recipient.private, &decoded).unwrap(), key);
            });
        }
    });
}

#[test]
fn test_keys_generated_concurrently_are_distinct() {
    let keys: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| KeyPair::generate().unwrap().public))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let unique: std::collections::HashSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len());
}
