//! Stencil CLI - build a static site from pages, shared partials and assets.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Static site builder driven by shared partial templates")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to stencil.toml config file
    #[arg(short, long, default_value = "stencil.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the site directories with placeholder content
    Init {
        /// Rewrite placeholder files even if the site already exists
        #[arg(short, long)]
        yes: bool,
    },

    /// Build the static site
    Build {
        /// Output directory (defaults to config or "public")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve the built site
    Serve {
        /// Address to listen on, e.g. ":8080" or "127.0.0.1:8080"
        addr: Option<String>,

        /// Directory to serve (defaults to the build output)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Open the site in a browser
        #[arg(long)]
        open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = config::ConfigFile::load(&cli.config)?;

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&config, &cli.config, yes)?;
        }
        Commands::Build { output } => {
            commands::build::run(&config, output)?;
        }
        Commands::Serve { addr, dir, open } => {
            commands::serve::run(&config, addr, dir, open).await?;
        }
    }

    Ok(())
}
