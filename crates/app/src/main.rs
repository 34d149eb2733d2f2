// CLI modules
mod args;
mod op;
mod ops;
mod output;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Decapsulate, Encapsulate, Init, Keys, Reencrypt, Rekey, Verify, Version};
use state::{AppConfig, AppState};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

command_enum! {
    (Init, Init),
    (Keys, Keys),
    (Encapsulate, Encapsulate),
    (Decapsulate, Decapsulate),
    (Rekey, Rekey),
    (Reencrypt, Reencrypt),
    (Verify, Verify),
    (Version, Version),
}

/// Install a compact stderr subscriber; returns the guard flushing the writer
fn init_logging(config: &AppConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let level = config.level().unwrap_or_else(|e| {
        eprintln!("Warning: {}, falling back to info", e);
        tracing::Level::INFO
    });

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(layer).init();
    guard
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Commands work without `kms init` where they need no stored key
    let config = match AppState::load(args.config_path.clone()) {
        Ok(state) => state.config,
        Err(_) => AppConfig::default(),
    };
    let guard = init_logging(&config);

    let ctx = op::OpContext::new(args.config_path, config, args.output);

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {}", e);
            1
        }
    };

    // process::exit skips destructors
    drop(guard);
    std::process::exit(code);
}
