use colored::Colorize;
use tabled::{builder::Builder, Table};

use ifrs9_core::ecl::{EclRun, PortfolioEclOutput};
use ifrs9_core::ComputationOutput;

use crate::OutputFormat;

/// Write the per-loan results table: one `ecl_<scenario>` column per scenario.
pub fn write_results_csv(
    path: &str,
    output: &PortfolioEclOutput,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to create '{path}': {e}"))?;

    let mut header = vec!["loan_id".to_string(), "sector".to_string(), "stage".to_string()];
    if let Some(first) = output.results.first() {
        for scenario in &first.scenario_ecl {
            header.push(format!("ecl_{}", scenario.scenario.to_lowercase()));
        }
    }
    header.push("weighted_ecl".to_string());
    header.push("horizon_months".to_string());
    writer.write_record(&header)?;

    for result in &output.results {
        let mut row = vec![
            result.loan_id.clone(),
            result.sector.clone(),
            result.stage.to_string(),
        ];
        for scenario in &result.scenario_ecl {
            row.push(scenario.ecl.to_string());
        }
        row.push(result.weighted_ecl.to_string());
        row.push(result.horizon_months.to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Print the run summary in the requested format.
pub fn print_summary(format: &OutputFormat, run: &EclRun) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(run)?);
        }
        OutputFormat::Table => {
            print_case("Base case", &run.base);
            if let Some(stressed) = &run.stressed {
                print_case("Stressed case", stressed);
                print_comparison(&run.base.result, &stressed.result);
            }
        }
    }
    Ok(())
}

fn print_case(title: &str, output: &ComputationOutput<PortfolioEclOutput>) {
    let result = &output.result;

    println!("\n{}", title.bold());

    let mut builder = Builder::default();
    builder.push_record(["Metric", "Value"]);
    builder.push_record(["Loans", &result.results.len().to_string()]);
    builder.push_record(["Stage 1", &result.stage_counts.stage_1.to_string()]);
    builder.push_record(["Stage 2", &result.stage_counts.stage_2.to_string()]);
    builder.push_record(["Stage 3", &result.stage_counts.stage_3.to_string()]);
    builder.push_record(["Total EAD", &result.total_ead.round_dp(2).to_string()]);
    builder.push_record(["Total weighted ECL", &result.total_weighted_ecl.to_string()]);
    println!("{}", Table::from(builder));

    if !result.sector_coverage.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Sector", "EAD", "ECL", "Coverage"]);
        for coverage in &result.sector_coverage {
            builder.push_record([
                coverage.sector.as_str(),
                &coverage.total_ead.round_dp(2).to_string(),
                &coverage.total_ecl.to_string(),
                &format!("{}%", (coverage.coverage_ratio * rust_decimal::Decimal::ONE_HUNDRED).round_dp(2)),
            ]);
        }
        println!("{}", Table::from(builder));
    }

    for warning in &output.warnings {
        println!("{} {}", "warning:".yellow(), warning);
    }
}

fn print_comparison(base: &PortfolioEclOutput, stressed: &PortfolioEclOutput) {
    let delta = stressed.total_weighted_ecl - base.total_weighted_ecl;
    println!(
        "\n{} total ECL {} → {} ({}{})",
        "Stress impact:".bold(),
        base.total_weighted_ecl,
        stressed.total_weighted_ecl,
        if delta >= rust_decimal::Decimal::ZERO { "+" } else { "" },
        delta
    );
}
