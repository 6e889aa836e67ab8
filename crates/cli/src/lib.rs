pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use spi_core::FilterSelection;

use commands::search::SearchArgs;

#[derive(Debug, Parser)]
#[command(
    name = "spi",
    about = "Laptop price intelligence operator CLI",
    long_about = "Manage the platform catalogs, inspect configuration, and run price queries offline.",
    after_help = "Examples:\n  spi seed\n  spi import croma croma.json --replace\n  spi search --brand Dell --ram 16GB --storage 512GB --processor i5\n  spi doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo catalog for all four platforms (idempotent)")]
    Seed,
    #[command(about = "Import a JSON export of listings into one platform's catalog")]
    Import {
        #[arg(help = "Target platform: reliance, pai, croma or flipkart")]
        platform: String,
        #[arg(help = "JSON file holding an array of listings")]
        file: PathBuf,
        #[arg(long, help = "Remove the platform's existing listings first")]
        replace: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, catalog contents and collaborators")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run a price query against the local catalog")]
    Search {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        ram: String,
        #[arg(long)]
        storage: String,
        #[arg(long, help = "Processor series, e.g. i5, Ryzen 5, M2")]
        processor: String,
    },
    #[command(about = "List distinct filter values from the reference platform")]
    Filters {
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        ram: Option<String>,
        #[arg(long)]
        storage: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Import { platform, file, replace } => {
            commands::import::run(&platform, &file, replace)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Search { brand, ram, storage, processor } => {
            commands::search::run(SearchArgs { brand, ram, storage, processor })
        }
        Command::Filters { brand, ram, storage } => {
            commands::filters::run(FilterSelection { brand, ram, storage })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
