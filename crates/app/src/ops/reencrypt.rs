use clap::Args;

use common::prelude::{reencrypt, Capsule, PreError, ReEncryptionKey};

use crate::op::{Op, OpContext};
use crate::ops::{parse_capsule, read_arg};
use crate::output::Report;

/// Transform a capsule for the delegatee of a re-encryption key
///
/// This is the proxy's operation: it needs no private key.
#[derive(Args, Debug, Clone)]
pub struct Reencrypt {
    /// Capsule as hex, inline or a file
    #[arg(long, value_parser = parse_capsule)]
    pub capsule: Capsule,

    /// Re-encryption key as hex, inline or a file
    #[arg(long)]
    pub rekey: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReencryptError {
    #[error("re-encryption failed: {0}")]
    Crypto(#[from] PreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl Op for Reencrypt {
    type Error = ReencryptError;
    type Output = Report;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let rkey = ReEncryptionKey::from_hex(&read_arg(&self.rekey)?)?;
        let transformed = reencrypt(&self.capsule, &rkey)?;

        Ok(ctx
            .report()
            .field("delegating", rkey.delegating_key().to_hex())
            .field("receiving", rkey.receiving_key().to_hex())
            .field("capsule", transformed.to_hex()))
    }
}
