use clap::Args;

use common::prelude::{Capsule, PublicKey};

use crate::op::{Op, OpContext};
use crate::ops::{parse_capsule, parse_public_key};
use crate::output::Report;

/// Check a capsule's proofs without opening it
#[derive(Args, Debug, Clone)]
pub struct Verify {
    /// Capsule as hex, inline or a file
    #[arg(long, value_parser = parse_capsule)]
    pub capsule: Capsule,

    /// Public key expected to open the capsule
    #[arg(long = "for", value_parser = parse_public_key)]
    pub for_key: Option<PublicKey>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("capsule verification failed")]
    Failed,
}

#[async_trait::async_trait]
impl Op for Verify {
    type Error = VerifyError;
    type Output = Report;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let valid = match &self.for_key {
            Some(public_key) => self.capsule.verify_for(public_key),
            None => self.capsule.verify(),
        };
        if !valid {
            return Err(VerifyError::Failed);
        }

        Ok(ctx
            .report()
            .field("valid", true)
            .field("reencrypted", self.capsule.is_reencrypted())
            .field(
                "delegating",
                self.capsule.delegating_key().map(|pk| pk.to_hex()),
            )
            .field(
                "receiving",
                self.capsule.receiving_key().map(|pk| pk.to_hex()),
            ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::prelude::KeyPair;

    #[tokio::test]
    async fn test_verify_original_capsule() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&alice.public).unwrap();
        let ctx = OpContext::default();

        let report = Verify {
            capsule,
            for_key: None,
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(report.get_str("delegating"), None);

        // original capsules do not name their recipient
        assert!(Verify {
            capsule,
            for_key: Some(bob.public),
        }
        .execute(&ctx)
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn test_verify_reencrypted_capsule_for_wrong_key() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let (capsule, _) = Capsule::encapsulate(&alice.public).unwrap();
        let rkey = alice.private.generate_rekey(&bob.public).unwrap();
        let transformed = rkey.reencrypt(&capsule).unwrap();
        let ctx = OpContext::default();

        let report = Verify {
            capsule: transformed,
            for_key: Some(bob.public),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(report.get_str("receiving"), Some(bob.public.to_hex().as_str()));

        let result = Verify {
            capsule: transformed,
            for_key: Some(alice.public),
        }
        .execute(&ctx)
        .await;
        assert!(matches!(result, Err(VerifyError::Failed)));
    }
}
