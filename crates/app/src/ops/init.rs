use clap::Args;

use crate::output::Report;
use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Default log level written to config.toml
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = Report;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            log_level: self.log_level.clone(),
            output: ctx.config.output,
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let public_key = state
            .load_key()?
            .public_key()
            .map_err(|e| crate::state::StateError::InvalidKey(e.to_string()))?;

        Ok(ctx
            .report()
            .field("directory", state.kms_dir.display().to_string())
            .field("key", state.key_path.display().to_string())
            .field("config", state.config_path.display().to_string())
            .field("public_key", public_key.to_hex()))
    }
}
