use clap::Args;
use colored::Colorize;
use rust_decimal::Decimal;

use ifrs9_core::ecl::{run_portfolio, EngineConfig};
use ifrs9_core::scenarios::ScenarioSet;
use ifrs9_core::staging::StagingConfig;
use ifrs9_core::stress::StressShock;

use crate::{input, output, OutputFormat};

/// Arguments for an ECL run
#[derive(Args)]
pub struct RunArgs {
    /// Portfolio CSV path
    #[arg(long)]
    pub input: String,

    /// Results CSV path (stressed results go to a `_stressed` sibling file)
    #[arg(long, default_value = "ifrs9_results.csv")]
    pub out: String,

    /// JSON file with the scenario set (defaults to Optimistic/Base/Downturn)
    #[arg(long)]
    pub scenarios: Option<String>,

    /// JSON file with the staging thresholds and zero-initial-PD policy
    #[arg(long)]
    pub staging: Option<String>,

    /// JSON file with the stress shock configuration
    #[arg(long, conflicts_with_all = ["pd_shock", "lgd_shock"])]
    pub shock: Option<String>,

    /// Multiplier applied to every loan's current PD for the stressed run
    #[arg(long)]
    pub pd_shock: Option<Decimal>,

    /// Multiplier applied to every loan's LGD for the stressed run
    #[arg(long, requires = "pd_shock")]
    pub lgd_shock: Option<Decimal>,
}

pub fn run_ecl(args: RunArgs, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let portfolio = input::read_portfolio_csv(&args.input)?;
    println!("{} Loaded {} loans from {}", "✓".green(), portfolio.len(), args.input);

    let scenarios = match &args.scenarios {
        Some(path) => input::read_json::<ScenarioSet>(path)?,
        None => ScenarioSet::baseline(),
    };
    let staging = match &args.staging {
        Some(path) => input::read_json::<StagingConfig>(path)?,
        None => StagingConfig::default(),
    };
    let config = EngineConfig { staging, scenarios };

    let shock = match (&args.shock, args.pd_shock) {
        (Some(path), _) => Some(input::read_json::<StressShock>(path)?),
        (None, Some(pd)) => Some(StressShock::new(pd, args.lgd_shock.unwrap_or(Decimal::ONE))),
        (None, None) => None,
    };

    let run = run_portfolio(&portfolio, &config, shock.as_ref())?;

    output::write_results_csv(&args.out, &run.base.result)?;
    println!("{} Wrote base results to {}", "✓".green(), args.out);

    if let Some(stressed) = &run.stressed {
        let stressed_path = stressed_sibling(&args.out);
        output::write_results_csv(&stressed_path, &stressed.result)?;
        println!("{} Wrote stressed results to {}", "✓".green(), stressed_path);
    }

    output::print_summary(format, &run)?;
    Ok(())
}

/// `results.csv` → `results_stressed.csv`
fn stressed_sibling(path: &str) -> String {
    match path.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_stressed.{ext}"),
        None => format!("{path}_stressed"),
    }
}
