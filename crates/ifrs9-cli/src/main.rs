mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::generate::GenerateArgs;
use commands::run::RunArgs;

/// IFRS 9 expected credit loss engine
#[derive(Parser)]
#[command(
    name = "ifrs9",
    version,
    about = "IFRS 9 expected credit loss calculations",
    long_about = "Classifies a loan portfolio into IFRS 9 stages, computes \
                  probability-weighted expected credit loss across macroeconomic \
                  scenarios with decimal precision, and runs stress comparisons."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for run summaries
    #[arg(long, default_value = "table", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic loan portfolio CSV
    Generate(GenerateArgs),
    /// Classify stages and compute weighted ECL for a portfolio CSV
    Run(RunArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Generate(args) => commands::generate::run_generate(args),
        Commands::Run(args) => commands::run::run_ecl(args, &cli.output),
        Commands::Version => {
            println!("ifrs9 {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(1);
    }
}
