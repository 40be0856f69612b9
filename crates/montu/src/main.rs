//! Montu CLI - newsletter server and sender for montumia.com.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::SiteConfig;

#[derive(Parser)]
#[command(name = "montu")]
#[command(about = "Newsletter server and sender for the montumia.com book")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to site.toml config file
    #[arg(short, long, default_value = "site.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default site.toml and newsletter content files
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Serve the newsletter endpoints and the built book
    Serve {
        /// Port to listen on (defaults to config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to config)
        #[arg(long)]
        host: Option<String>,

        /// Directory with the built book (defaults to config)
        #[arg(short, long)]
        dist: Option<PathBuf>,
    },

    /// Print the unsubscribe link for an address
    Link {
        /// Subscriber email address
        email: String,
    },

    /// Send the current newsletter issue
    Send {
        /// Recipient address (repeatable)
        #[arg(long = "to", value_name = "EMAIL")]
        to: Vec<String>,

        /// Send to every contact on the list
        #[arg(long, conflicts_with = "to")]
        audience: bool,

        /// Render every message but do not deliver
        #[arg(long)]
        dry_run: bool,
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

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes).await?;
        }
        Commands::Serve { port, host, dist } => {
            let config = SiteConfig::load(&cli.config)?;
            commands::serve::run(config, port, host, dist).await?;
        }
        Commands::Link { email } => {
            let config = SiteConfig::load(&cli.config)?;
            commands::link::run(&config, &email)?;
        }
        Commands::Send {
            to,
            audience,
            dry_run,
        } => {
            let config = SiteConfig::load(&cli.config)?;
            commands::send::run(&config, to, audience, dry_run).await?;
        }
    }

    Ok(())
}
