//! Secure random sources
//!
//! Every operation that needs fresh randomness takes a [`RandomSource`]. The
//! default is [`OsRandom`], backed by the operating system CSPRNG. A seeded
//! `rand::rngs::StdRng` can stand in for it, which is how tests pin seeds.

use curve25519_dalek::scalar::Scalar;
use zeroize::Zeroizing;

use super::error::{PreError, PreResult};

/// How many times [`OsRandom`] retries a failing draw before giving up
pub const OS_RANDOM_ATTEMPTS: usize = 3;

/// A source of uniformly random bytes
pub trait RandomSource {
    /// Fill `dest` entirely with random bytes
    fn fill(&mut self, dest: &mut [u8]) -> PreResult<()>;
}

/// The operating system's CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&mut self, dest: &mut [u8]) -> PreResult<()> {
        let mut last_error = None;
        for attempt in 1..=OS_RANDOM_ATTEMPTS {
            match getrandom::getrandom(dest) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(attempt, "entropy source not ready: {}", e);
                    last_error = Some(e);
                }
            }
        }
        Err(PreError::RandomSource(match last_error {
            Some(e) => e.to_string(),
            None => "entropy source exhausted".to_string(),
        }))
    }
}

impl RandomSource for rand::rngs::StdRng {
    fn fill(&mut self, dest: &mut [u8]) -> PreResult<()> {
        rand::RngCore::fill_bytes(self, dest);
        Ok(())
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn fill(&mut self, dest: &mut [u8]) -> PreResult<()> {
        (**self).fill(dest)
    }
}

/// Draw a uniformly random non-zero scalar
///
/// Samples 64 bytes and reduces them modulo the group order, redrawing on zero.
pub(crate) fn nonzero_scalar<R: RandomSource + ?Sized>(rng: &mut R) -> PreResult<Scalar> {
    let mut wide = Zeroizing::new([0u8; 64]);
    loop {
        rng.fill(&mut wide[..])?;
        let scalar = Scalar::from_bytes_mod_order_wide(&wide);
        if scalar != Scalar::ZERO {
            return Ok(scalar);
        }
        tracing::trace!("drew zero scalar, redrawing");
    }
}
