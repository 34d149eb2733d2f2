use clap::{Args, Subcommand};

use common::prelude::{KeyPair, PreError};

use crate::op::{Op, OpContext};
use crate::output::Report;
use crate::state::StateError;

crate::command_enum! {
    (Generate, Generate),
    (Public, Public),
}

pub type KeysCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Keys {
    #[command(subcommand)]
    pub command: KeysCommand,
}

#[async_trait::async_trait]
impl Op for Keys {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeysError {
    #[error("key operation failed: {0}")]
    Crypto(#[from] PreError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

/// Generate a fresh key pair without storing it
#[derive(Args, Debug, Clone)]
pub struct Generate {
    /// Print keys as PEM instead of hex
    #[arg(long)]
    pub pem: bool,
}

#[async_trait::async_trait]
impl Op for Generate {
    type Error = KeysError;
    type Output = Report;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let keypair = KeyPair::generate()?;
        let (private_key, public_key) = if self.pem {
            (keypair.private.to_pem()?, keypair.public.to_pem())
        } else {
            (keypair.private.to_hex()?, keypair.public.to_hex())
        };

        Ok(ctx
            .report()
            .field("private_key", private_key)
            .field("public_key", public_key))
    }
}

/// Print the public key of the stored private key
#[derive(Args, Debug, Clone)]
pub struct Public {
    /// Print the key as PEM instead of hex
    #[arg(long)]
    pub pem: bool,
}

#[async_trait::async_trait]
impl Op for Public {
    type Error = KeysError;
    type Output = Report;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let public_key = ctx.state()?.load_key()?.public_key()?;
        let rendered = if self.pem {
            public_key.to_pem()
        } else {
            public_key.to_hex()
        };
        Ok(ctx.report().field("public_key", rendered))
    }
}
