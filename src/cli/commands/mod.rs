//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod init;
mod plans;
mod providers;
mod scrape;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, Settings};

#[derive(Parser)]
#[command(name = "planscout")]
#[command(about = "eSIM data plan price tracker")]
#[command(version)]
pub struct Cli {
    /// Data directory holding the plan database (overrides config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Scrape plans from one or more providers
    Scrape {
        /// Provider names to scrape (defaults to all wired providers)
        providers: Vec<String>,
        /// Scrape all wired providers
        #[arg(short, long)]
        all: bool,
        /// Scrape a single country (ISO 3166-1 alpha-2 code)
        #[arg(long, conflicts_with = "group")]
        country: Option<String>,
        /// Scrape a fixed country group (1 or 2) instead of each provider's full list
        #[arg(short, long)]
        group: Option<u8>,
        /// Use the plain-HTTP scraper variant where one exists
        #[arg(long)]
        http_only: bool,
    },

    /// List known providers
    Providers,

    /// Show recent scrape runs and a 24h summary
    Status {
        /// Limit number of runs shown
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List stored plans for a country, cheapest first
    Plans {
        /// ISO 3166-1 alpha-2 country code
        country_code: String,
        /// Limit number of plans shown
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Filter by provider name
        #[arg(short, long)]
        provider: Option<String>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    if let Some(data_dir) = cli.data_dir {
        settings = Settings::with_data_dir(data_dir);
    }

    match cli.command {
        Commands::Init => init::cmd_init(&settings),
        Commands::Scrape {
            providers,
            all,
            country,
            group,
            http_only,
        } => {
            scrape::cmd_scrape(
                &settings,
                &providers,
                all,
                country.as_deref(),
                group,
                http_only,
            )
            .await
        }
        Commands::Providers => providers::cmd_providers(&settings),
        Commands::Status { limit } => status::cmd_status(&settings, limit),
        Commands::Plans {
            country_code,
            limit,
            provider,
        } => plans::cmd_plans(&settings, &country_code, provider.as_deref(), limit),
    }
}
