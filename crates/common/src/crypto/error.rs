/// Errors that can occur during key, capsule and re-encryption operations
///
/// Callers should treat [`PreError::Integrity`] as a tampering signal rather than
/// a transient fault. It is never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreError {
    /// Malformed scalar, point, length or tag, or otherwise unusable key material
    #[error("validation error: {0}")]
    Validation(String),
    /// A capsule failed its proof check at decapsulation
    #[error("integrity error: capsule verification failed")]
    Integrity,
    /// The proxy refused to transform a capsule
    #[error("invalid capsule: {0}")]
    InvalidCapsule(String),
    /// The secure random source could not supply entropy
    #[error("random source error: {0}")]
    RandomSource(String),
    /// A secret-bearing value was used after it was wiped
    #[error("secret material has been wiped")]
    Wiped,
}

impl PreError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        PreError::Validation(msg.into())
    }

    pub(crate) fn invalid_capsule(msg: impl Into<String>) -> Self {
        PreError::InvalidCapsule(msg.into())
    }
}

pub type PreResult<T> = Result<T, PreError>;
