use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod commands;
mod config;

#[derive(Parser, Debug, Clone)]
#[clap(version, author)]
/// Fetch, decrypt and inspect live-TV channel playlists.
struct LumenArgs {
    /// Debug output
    #[clap(long, alias = "debug", global = true)]
    verbose: bool,

    /// Settings file in TOML format
    #[clap(short, long, env = "LUMEN_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: commands::LumenCommand,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = LumenArgs::parse();

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .try_from_env()
                .unwrap_or_else(|_| EnvFilter::new(level.to_string())),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = config::Settings::load(args.config.as_deref())?;
    args.command.run(settings).await
}
