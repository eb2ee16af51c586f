mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kobo99::config::Config;
use kobo99::crawler::WeekId;

#[derive(Parser)]
#[command(
    name = "kobo99",
    version,
    about = "Builds a calendar of Kobo's daily 99 e-book deals from the weekly blog posts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "KOBO99_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl weekly articles, update the entry store and write the calendar
    Crawl {
        /// First week to crawl (e.g. 2025-W48)
        #[arg(long)]
        start: Option<WeekId>,

        /// Last week to crawl; defaults to the current week
        #[arg(long)]
        end: Option<WeekId>,

        /// Number of weeks ending at --end when --start is not given
        #[arg(short, long, default_value = "4")]
        weeks: u32,

        /// Do not read or update the entry store
        #[arg(long, default_value = "false")]
        no_store: bool,

        /// Calendar output path
        #[arg(long)]
        ics: Option<PathBuf>,
    },

    /// Parse a saved article page and print its entries
    Parse {
        /// HTML file to parse
        #[arg(short, long)]
        file: PathBuf,

        /// Article URL the page was downloaded from
        #[arg(short, long)]
        url: String,

        /// Print entries as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Write the calendar from the entry store without crawling
    Export {
        /// Calendar output path
        #[arg(long)]
        ics: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::debug!("kobo99 starting");

    match cli.command {
        Commands::Crawl {
            start,
            end,
            weeks,
            no_store,
            ics,
        } => {
            tracing::info!(
                start = ?start,
                end = ?end,
                weeks = %weeks,
                no_store = %no_store,
                "Starting crawl command"
            );
            commands::crawl(config, start, end, weeks, no_store, ics).await?;
        }

        Commands::Parse { file, url, json } => {
            tracing::info!(file = %file.display(), url = %url, "Starting parse command");
            commands::parse(config, file, url, json)?;
        }

        Commands::Export { ics } => {
            tracing::info!(ics = ?ics, "Starting export command");
            commands::export(config, ics)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("kobo99=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("kobo99={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
