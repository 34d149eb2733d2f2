use clap::Args;

use common::prelude::{Capsule, PreError, PublicKey};

use crate::op::{Op, OpContext};
use crate::ops::parse_public_key;
use crate::output::Report;
use crate::state::StateError;

/// Encapsulate a fresh symmetric key
#[derive(Args, Debug, Clone)]
pub struct Encapsulate {
    /// Recipient public key as hex or PEM, inline or a file (defaults to your own key)
    #[arg(long, value_parser = parse_public_key)]
    pub to: Option<PublicKey>,
}

#[derive(Debug, thiserror::Error)]
pub enum EncapsulateError {
    #[error("encapsulation failed: {0}")]
    Crypto(#[from] PreError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl Op for Encapsulate {
    type Error = EncapsulateError;
    type Output = Report;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let recipient = match self.to {
            Some(public_key) => public_key,
            None => ctx.state()?.load_key()?.public_key()?,
        };

        let (capsule, key) = Capsule::encapsulate(&recipient)?;
        tracing::debug!(recipient = %recipient, "encapsulated key");

        Ok(ctx
            .report()
            .field("recipient", recipient.to_hex())
            .field("capsule", capsule.to_hex())
            .field("symmetric_key", hex::encode(key.as_bytes()?)))
    }
}
