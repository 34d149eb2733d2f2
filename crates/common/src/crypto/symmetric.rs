use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::curve::SYMMETRIC_KEY_SIZE;
use super::error::{PreError, PreResult};

/// A 256-bit symmetric key produced by the capsule KEM
///
/// The engine never uses this key itself; it is handed to an external AEAD
/// layer that protects the payload. Zeroized on drop and on [`SymmetricKey::wipe`]
/// or [`Zeroize::zeroize`].
pub struct SymmetricKey {
    bytes: [u8; SYMMETRIC_KEY_SIZE],
    wiped: bool,
}

impl SymmetricKey {
    pub(crate) fn new(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self {
            bytes,
            wiped: false,
        }
    }

    /// Key bytes for the AEAD layer
    pub fn as_bytes(&self) -> PreResult<&[u8; SYMMETRIC_KEY_SIZE]> {
        if self.wiped {
            return Err(PreError::Wiped);
        }
        Ok(&self.bytes)
    }

    pub fn wipe(&mut self) {
        self.bytes.zeroize();
        self.wiped = true;
    }

    pub fn is_wiped(&self) -> bool {
        self.wiped
    }
}

impl Zeroize for SymmetricKey {
    fn zeroize(&mut self) {
        self.wipe();
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl ZeroizeOnDrop for SymmetricKey {}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.wiped == other.wiped && bool::from(self.bytes[..].ct_eq(&other.bytes[..]))
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("wiped", &self.wiped)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wipe() {
        let mut key = SymmetricKey::new([7u8; SYMMETRIC_KEY_SIZE]);
        assert_eq!(key.as_bytes().unwrap(), &[7u8; SYMMETRIC_KEY_SIZE]);
        key.wipe();
        key.wipe();
        assert!(key.is_wiped());
        assert_eq!(key.as_bytes(), Err(PreError::Wiped));
    }

    #[test]
    fn test_zeroize_wipes() {
        let mut key = SymmetricKey::new([7u8; SYMMETRIC_KEY_SIZE]);
        key.zeroize();
        assert!(key.is_wiped());
        assert_eq!(key.as_bytes(), Err(PreError::Wiped));
    }

    #[test]
    fn test_debug_redacts() {
        let key = SymmetricKey::new([0xabu8; SYMMETRIC_KEY_SIZE]);
        assert!(!format!("{key:?}").contains("ab"));
    }
}
