mod api;
mod config;
mod currencies;
mod error;
mod exchange_rates;
mod models;
mod tui;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::currencies::Converter;
use crate::models::CurrencyDirectory;

#[derive(Parser)]
#[command(name = "currency-converter", version)]
#[command(about = "Convert amounts between currencies using exchangerate-api.com rates")]
struct Cli {
    /// Path to config.toml (defaults to the one next to Cargo.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive converter (default)
    Tui,
    /// Convert a single amount and print the result
    Convert {
        /// Source currency code, e.g. USD
        #[arg(value_parser = parse_code)]
        from: String,
        /// Destination currency code, e.g. EUR
        #[arg(value_parser = parse_code)]
        to: String,
        /// Whole amount, at least 1
        #[arg(default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        amount: u32,
    },
    /// List supported currencies, optionally filtered
    Currencies {
        /// Case-insensitive text to look for in "{name} - {code}"
        query: Option<String>,
    },
}

fn parse_code(raw: &str) -> Result<String, String> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return Err("currency code must not be empty".to_string());
    }
    Ok(code)
}

fn init_logging(config: &config::Config, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;

    if to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Arc::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    let command = cli.command.unwrap_or(Commands::Tui);
    init_logging(&config, matches!(command, Commands::Tui))?;

    let client = api::ExchangeRateClient::new(&config)?;
    let converter = Converter::new(Arc::new(client), &config);

    match command {
        Commands::Tui => {
            let popular =
                CurrencyDirectory::popular(&config.popular_currencies, converter.localized_names());
            tui::start_tui(&converter, popular).await?;
        }
        Commands::Convert { from, to, amount } => convert(&converter, &from, &to, amount).await?,
        Commands::Currencies { query } => list_currencies(&converter, query.as_deref()).await?,
    }

    Ok(())
}

async fn convert(converter: &Converter, from: &str, to: &str, amount: u32) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message("Fetching exchange rates...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = converter.convert_currency(from, to, f64::from(amount)).await;
    spinner.finish_and_clear();

    match result {
        Ok(conversion) => {
            println!("{}", conversion);
            println!("1 {} = {} {}", conversion.from, conversion.rate, conversion.to);
            println!("Rates last updated: {}", conversion.last_updated_display());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

async fn list_currencies(converter: &Converter, query: Option<&str>) -> Result<()> {
    match converter.search_currencies(query.unwrap_or("")).await {
        Ok(entries) => {
            for entry in &entries {
                println!("{:<6} {}", entry.code, entry.label());
            }
            println!("\n{} currencies", entries.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}
