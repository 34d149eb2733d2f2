/**
 * Proxy re-encryption primitives.
 *  - Key pairs, capsules and re-encryption keys
 *  - The proxy transform and its proofs
 *  - Versioned binary, hex and PEM encodings
 */
pub mod crypto;
/**
 * One handle bundling a random source with
 *  every engine operation.
 */
pub mod kmschain;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{
        reencrypt, Capsule, KeyPair, OsRandom, PreError, PreResult, PrivateKey, PublicKey,
        RandomSource, ReEncryptionKey, SymmetricKey,
    };
    pub use crate::kmschain::KmsChain;
    pub use crate::build_info;
}
