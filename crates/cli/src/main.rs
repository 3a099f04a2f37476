//! Herald CLI — the main entry point.
//!
//! Commands:
//! - `demo` — Run a loopback session (server + client in one process)
//! - `init` — Write a settings file populated with defaults

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod demo;
mod init;

#[derive(Parser)]
#[command(
    name = "herald",
    about = "Herald — command & chat protocol layer for client/server games",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a local loopback session: one server, one player, one observer
    Demo {
        /// Command prefix character
        #[arg(long, default_value_t = '/')]
        prefix: char,
    },

    /// Write a settings file populated with defaults
    Init {
        /// Path of the settings file to create
        #[arg(long, default_value = "herald.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Demo { prefix } => demo::run(prefix).await?,
        Commands::Init { path } => init::run(&path)?,
    }

    Ok(())
}
