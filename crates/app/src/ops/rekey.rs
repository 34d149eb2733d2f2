use clap::Args;

use common::prelude::{PreError, PublicKey};

use crate::op::{Op, OpContext};
use crate::ops::parse_public_key;
use crate::output::Report;
use crate::state::StateError;

/// Delegate capsules for the stored key to another public key
#[derive(Args, Debug, Clone)]
pub struct Rekey {
    /// Delegatee public key as hex or PEM, inline or a file
    #[arg(long, value_parser = parse_public_key)]
    pub to: PublicKey,
}

#[derive(Debug, thiserror::Error)]
pub enum RekeyError {
    #[error("re-encryption key derivation failed: {0}")]
    Crypto(#[from] PreError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl Op for Rekey {
    type Error = RekeyError;
    type Output = Report;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let private_key = ctx.state()?.load_key()?;
        let rkey = private_key.generate_rekey(&self.to)?;

        tracing::info!(
            delegating = %rkey.delegating_key(),
            receiving = %rkey.receiving_key(),
            "issued re-encryption key"
        );

        Ok(ctx
            .report()
            .field("delegating", rkey.delegating_key().to_hex())
            .field("receiving", rkey.receiving_key().to_hex())
            .field("rekey", rkey.to_hex()?))
    }
}
