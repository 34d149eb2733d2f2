pub use clap::Parser;

use std::path::PathBuf;

use crate::state::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "kms")]
#[command(about = "Proxy re-encryption key management and capsule transforms")]
#[command(version)]
pub struct Args {
    /// Path to the kmschain state directory (defaults to ~/.kmschain)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Output format, overriding the configured one
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: crate::Command,
}
