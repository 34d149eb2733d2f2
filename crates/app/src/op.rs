use std::error::Error;
use std::path::PathBuf;

use crate::output::Report;
use crate::state::{AppConfig, AppState, OutputFormat, StateError};

#[derive(Clone, Debug, Default)]
pub struct OpContext {
    /// Optional custom state path (defaults to ~/.kmschain)
    pub config_path: Option<PathBuf>,
    /// Configuration loaded at startup, or defaults when not initialized
    pub config: AppConfig,
}

impl OpContext {
    /// Build a context, applying an explicit `--output` over the configured one
    pub fn new(
        config_path: Option<PathBuf>,
        mut config: AppConfig,
        output: Option<OutputFormat>,
    ) -> Self {
        if let Some(output) = output {
            config.output = output;
        }
        Self {
            config_path,
            config,
        }
    }

    pub fn state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }

    /// An empty report in the configured output format
    pub fn report(&self) -> Report {
        Report::new(self.config.output)
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
