use std::path::PathBuf;

use clap::Args;

use common::prelude::{Capsule, PreError};

use crate::op::{Op, OpContext};
use crate::ops::parse_capsule;
use crate::output::Report;
use crate::state::{self, StateError};

/// Recover the symmetric key from an original or re-encrypted capsule
#[derive(Args, Debug, Clone)]
pub struct Decapsulate {
    /// Capsule as hex, inline or a file
    #[arg(long, value_parser = parse_capsule)]
    pub capsule: Capsule,

    /// Private key PEM file (defaults to the stored key)
    #[arg(long)]
    pub key: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecapsulateError {
    #[error("decapsulation failed: {0}")]
    Crypto(#[from] PreError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl Op for Decapsulate {
    type Error = DecapsulateError;
    type Output = Report;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let private_key = match &self.key {
            Some(path) => state::load_key_file(path)?,
            None => ctx.state()?.load_key()?,
        };

        let key = self.capsule.decapsulate(&private_key)?;

        Ok(ctx
            .report()
            .field("symmetric_key", hex::encode(key.as_bytes()?))
            .field("reencrypted", self.capsule.is_reencrypted()))
    }
}
