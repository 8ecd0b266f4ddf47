pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use cleanquote_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use rust_decimal::Decimal;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    name = "cleanquote",
    about = "Cleanquote pricing CLI",
    long_about = "Price cleaning-service quotes, inspect rate tables and check pricing configuration.",
    after_help = "Examples:\n  cleanquote quote --input request.json --json\n  cleanquote rates --category office\n  cleanquote --tax-rate 0.1 doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a cleanquote.toml file")]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: OverrideArgs,
    #[command(subcommand)]
    command: Command,
}

/// Per-invocation settings; these win over env vars and the config file.
#[derive(Debug, Default, Args)]
struct OverrideArgs {
    #[arg(long, global = true, help = "Override pricing.currency")]
    currency: Option<String>,
    #[arg(long, global = true, help = "Override pricing.tax_rate")]
    tax_rate: Option<Decimal>,
    #[arg(long, global = true, help = "Override pricing.minimum_charge")]
    minimum_charge: Option<Decimal>,
    #[arg(long, global = true, help = "Override pricing.rounding_step")]
    rounding_step: Option<Decimal>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a quote request file and print the line items and totals")]
    Quote {
        #[arg(long, help = "JSON quote request to price")]
        input: PathBuf,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the configured per-m² rate tiers")]
    Rates {
        #[arg(long, help = "Only show one service category")]
        category: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate configuration and pricing table readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        let overrides = &self.overrides;
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                currency: overrides.currency.clone(),
                tax_rate: overrides.tax_rate,
                minimum_charge: overrides.minimum_charge,
                rounding_step: overrides.rounding_step,
                log_level: overrides.log_level.clone(),
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    init_logging(&options);

    let result = match cli.command {
        Command::Quote { input, json } => commands::quote::run(&input, &options, json),
        Command::Rates { category } => commands::rates::run(category.as_deref(), &options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays parseable. A config that fails to load
/// falls back to info/compact; the command itself reports the failure.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case that subscriber keeps receiving events.
fn init_logging(options: &LoadOptions) -> bool {
    let (level, format) = match AppConfig::load(options.clone()) {
        Ok(config) => {
            (config.logging.level.parse::<Level>().unwrap_or(Level::INFO), config.logging.format)
        }
        Err(_) => (Level::INFO, LogFormat::Compact),
    };

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    match installed {
        Ok(()) => true,
        Err(error) => {
            tracing::debug!(
                event_name = "system.logging.init_skipped",
                error = %error,
                "global subscriber already set; keeping it"
            );
            false
        }
    }
}
