use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::discount::{discount_factor, horizon_months, lifetime_loss, scenario_loss};
use crate::error::Ifrs9Error;
use crate::scenarios::{adjusted_pd, ScenarioSet};
use crate::staging::{classify, StagingConfig, ZeroInitialPdPolicy};
use crate::stress::{apply_shock, StressShock};
use crate::types::*;
use crate::Ifrs9Result;

/// Monetary outputs are reported to cents.
const MONEY_DP: u32 = 2;

// ---------------------------------------------------------------------------
// Configuration and output types
// ---------------------------------------------------------------------------

/// Full engine configuration for one run. Read-only during the run; separate
/// runs with different thresholds or scenario sets cannot interfere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub staging: StagingConfig,
    pub scenarios: ScenarioSet,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            staging: StagingConfig::default(),
            scenarios: ScenarioSet::baseline(),
        }
    }
}

/// Number of loans in each stage after classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub stage_1: u32,
    pub stage_2: u32,
    pub stage_3: u32,
}

impl StageCounts {
    fn record(&mut self, stage: Stage) {
        match stage {
            Stage::One => self.stage_1 += 1,
            Stage::Two => self.stage_2 += 1,
            Stage::Three => self.stage_3 += 1,
        }
    }
}

/// Provision coverage for one sector: weighted ECL over total exposure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorCoverage {
    pub sector: String,
    pub total_ead: Money,
    pub total_ecl: Money,
    /// ECL ÷ EAD; zero when the sector carries no exposure.
    pub coverage_ratio: Rate,
}

/// Portfolio-level engine output: per-loan results plus pure-reduction rollups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioEclOutput {
    pub results: Vec<LoanEcl>,
    pub stage_counts: StageCounts,
    pub total_weighted_ecl: Money,
    pub total_ead: Money,
    pub sector_coverage: Vec<SectorCoverage>,
}

/// Result of a full run: the base case, plus the stressed case when a shock
/// was configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EclRun {
    pub base: ComputationOutput<PortfolioEclOutput>,
    pub stressed: Option<ComputationOutput<PortfolioEclOutput>>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn probability_in_unit_interval(
    loan_id: &str,
    field: &str,
    value: Decimal,
) -> Ifrs9Result<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(Ifrs9Error::Range {
            loan_id: loan_id.to_string(),
            field: field.to_string(),
            reason: format!("Must be between 0 and 1 (got {value})"),
        });
    }
    Ok(())
}

/// Validate the portfolio and configuration before any per-loan computation.
///
/// Fail-fast: a malformed portfolio produces no partial results, and every
/// error names the offending field and loan. Once this passes, per-loan
/// computation is a closed arithmetic expression that cannot fail.
pub fn validate_portfolio(portfolio: &[LoanRecord], config: &EngineConfig) -> Ifrs9Result<()> {
    config.scenarios.validate()?;

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for loan in portfolio {
        if loan.loan_id.is_empty() {
            return Err(Ifrs9Error::Schema {
                column: "loan_id".into(),
                reason: "Loan id must not be empty".into(),
            });
        }
        if !seen_ids.insert(loan.loan_id.as_str()) {
            return Err(Ifrs9Error::Schema {
                column: "loan_id".into(),
                reason: format!("Duplicate loan id '{}'", loan.loan_id),
            });
        }

        probability_in_unit_interval(&loan.loan_id, "initial_pd", loan.initial_pd)?;
        probability_in_unit_interval(&loan.loan_id, "current_pd", loan.current_pd)?;
        probability_in_unit_interval(&loan.loan_id, "lgd", loan.lgd)?;

        if loan.ead < Decimal::ZERO {
            return Err(Ifrs9Error::Range {
                loan_id: loan.loan_id.clone(),
                field: "ead".into(),
                reason: format!("Exposure cannot be negative (got {})", loan.ead),
            });
        }
        if loan.eir < Decimal::ZERO {
            return Err(Ifrs9Error::Range {
                loan_id: loan.loan_id.clone(),
                field: "eir".into(),
                reason: format!(
                    "Effective interest rate cannot be negative (got {})",
                    loan.eir
                ),
            });
        }

        if config.staging.zero_initial_pd == ZeroInitialPdPolicy::Reject
            && loan.initial_pd.is_zero()
        {
            return Err(Ifrs9Error::Policy {
                loan_id: loan.loan_id.clone(),
                reason: "initial_pd is zero; SICR ratio is undefined".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Per-loan computation
// ---------------------------------------------------------------------------

/// Stage, per-scenario loss and probability-weighted ECL for a single loan.
///
/// Stage 1 carries a 12-month loss; Stages 2 and 3 sum discounted marginal
/// losses over the remaining life, so a loan migrating out of Stage 1 can
/// never lose provision in the move. Independent of every other loan, so
/// portfolio evaluation is a plain map.
pub fn loan_ecl(loan: &LoanRecord, config: &EngineConfig) -> Ifrs9Result<LoanEcl> {
    let stage = classify(loan, &config.staging)?;
    let horizon = horizon_months(stage, loan.remaining_term_months);
    let factor = discount_factor(loan.eir, horizon);

    let mut scenario_ecl = Vec::with_capacity(config.scenarios.scenarios.len());
    let mut weighted = Decimal::ZERO;
    for scenario in &config.scenarios.scenarios {
        let scenario_pd = adjusted_pd(loan.current_pd, scenario);
        let loss = if stage.is_lifetime() {
            lifetime_loss(scenario_pd, loan.lgd, loan.ead, loan.eir, horizon)
        } else {
            scenario_loss(scenario_pd, loan.lgd, loan.ead, factor)
        }
        .round_dp(MONEY_DP);
        weighted += scenario.weight * loss;
        scenario_ecl.push(ScenarioEcl {
            scenario: scenario.name.clone(),
            ecl: loss,
        });
    }

    Ok(LoanEcl {
        loan_id: loan.loan_id.clone(),
        sector: loan.sector.clone(),
        stage,
        scenario_ecl,
        weighted_ecl: weighted.round_dp(MONEY_DP),
        horizon_months: horizon,
    })
}

// ---------------------------------------------------------------------------
// Portfolio pipeline
// ---------------------------------------------------------------------------

/// Run the full pipeline over a portfolio: validate, classify, compute
/// per-scenario losses, weight, and roll up.
pub fn compute_portfolio_ecl(
    portfolio: &[LoanRecord],
    config: &EngineConfig,
) -> Ifrs9Result<ComputationOutput<PortfolioEclOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_portfolio(portfolio, config)?;

    if portfolio.is_empty() {
        warnings.push("Portfolio is empty; all rollups are zero.".into());
    }

    let results = portfolio
        .iter()
        .map(|loan| loan_ecl(loan, config))
        .collect::<Ifrs9Result<Vec<_>>>()?;

    // Rollups are pure reductions over the per-loan results.
    let mut stage_counts = StageCounts::default();
    let mut total_weighted_ecl = Decimal::ZERO;
    let mut by_sector: BTreeMap<&str, (Money, Money)> = BTreeMap::new();

    for (loan, result) in portfolio.iter().zip(results.iter()) {
        stage_counts.record(result.stage);
        total_weighted_ecl += result.weighted_ecl;
        let entry = by_sector
            .entry(loan.sector.as_str())
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 += loan.ead;
        entry.1 += result.weighted_ecl;
    }

    let total_ead: Money = portfolio.iter().map(|l| l.ead).sum();

    let sector_coverage = by_sector
        .into_iter()
        .map(|(sector, (ead, ecl))| {
            let coverage_ratio = if ead.is_zero() {
                warnings.push(format!("Sector '{sector}' has zero exposure; coverage set to 0."));
                Decimal::ZERO
            } else {
                ecl / ead
            };
            SectorCoverage {
                sector: sector.to_string(),
                total_ead: ead,
                total_ecl: ecl,
                coverage_ratio,
            }
        })
        .collect();

    let output = PortfolioEclOutput {
        results,
        stage_counts,
        total_weighted_ecl,
        total_ead,
        sector_coverage,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "default_threshold": config.staging.default_threshold.to_string(),
        "sicr_ratio": config.staging.sicr_ratio.to_string(),
        "zero_initial_pd_policy": config.staging.zero_initial_pd,
        "num_scenarios": config.scenarios.scenarios.len(),
        "stage_1_horizon": "12 months",
        "lifetime_method": "survival-weighted marginal annual losses",
    });

    Ok(with_metadata(
        "IFRS 9 three-stage ECL (general approach)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// Single entry point for the orchestrating layer.
///
/// The base case always runs on the portfolio as given. When a shock is
/// supplied, the same pipeline runs a second time on a shocked copy; the base
/// records are never mutated, so both result sets are directly comparable.
pub fn run_portfolio(
    portfolio: &[LoanRecord],
    config: &EngineConfig,
    shock: Option<&StressShock>,
) -> Ifrs9Result<EclRun> {
    if let Some(shock) = shock {
        shock.validate()?;
    }

    let base = compute_portfolio_ecl(portfolio, config)?;
    let stressed = match shock {
        Some(shock) => {
            let shocked = apply_shock(portfolio, shock);
            Some(compute_portfolio_ecl(&shocked, config)?)
        }
        None => None,
    };

    Ok(EclRun { base, stressed })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioDefinition;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn loan(
        id: &str,
        sector: &str,
        initial_pd: Decimal,
        current_pd: Decimal,
        ead: Decimal,
        eir: Decimal,
        term: u32,
    ) -> LoanRecord {
        LoanRecord {
            loan_id: id.into(),
            sector: sector.into(),
            initial_pd,
            current_pd,
            lgd: dec!(0.45),
            ead,
            eir,
            remaining_term_months: term,
        }
    }

    fn sample_portfolio() -> Vec<LoanRecord> {
        vec![
            // improving PD, long-dated
            loan("L001", "Retail", dec!(0.02), dec!(0.01), dec!(100_000), dec!(0), 60),
            // ratio 5 -> SICR
            loan("L002", "Corporate", dec!(0.02), dec!(0.10), dec!(100_000), dec!(0), 24),
            // defaulted
            loan("L003", "SME", dec!(0.30), dec!(0.60), dec!(500_000), dec!(0.04), 36),
        ]
    }

    #[test]
    fn test_end_to_end_stage_one() {
        let result = loan_ecl(
            &loan("A", "Retail", dec!(0.02), dec!(0.01), dec!(100_000), dec!(0), 60),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(result.stage, Stage::One);
        assert_eq!(result.horizon_months, 12);
        // eir = 0 so no discounting: 0.30*360 + 0.40*450 + 0.30*675 = 490.50
        assert_eq!(result.weighted_ecl, dec!(490.50));
    }

    #[test]
    fn test_end_to_end_stage_two_lifetime() {
        let result = loan_ecl(
            &loan("B", "Corporate", dec!(0.02), dec!(0.10), dec!(100_000), dec!(0), 24),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(result.stage, Stage::Two);
        assert_eq!(result.horizon_months, 24);
        // Two years of marginal losses, eir = 0 so no discounting:
        //   Optimistic (pd 0.08): 3600 + 0.92*3600 = 6912
        //   Base       (pd 0.10): 4500 + 0.90*4500 = 8550
        //   Downturn   (pd 0.15): 6750 + 0.85*6750 = 12487.50
        // weighted: 0.30*6912 + 0.40*8550 + 0.30*12487.50 = 9239.85
        assert_eq!(result.weighted_ecl, dec!(9239.85));
    }

    #[test]
    fn test_end_to_end_stage_three_regardless_of_initial_pd() {
        for initial in [dec!(0.0001), dec!(0.02), dec!(0.50)] {
            let result = loan_ecl(
                &loan("C", "SME", initial, dec!(0.60), dec!(100_000), dec!(0.03), 36),
                &EngineConfig::default(),
            )
            .unwrap();
            assert_eq!(result.stage, Stage::Three);
            assert_eq!(result.horizon_months, 36);
        }
    }

    #[test]
    fn test_weighted_ecl_is_weight_sum_of_scenario_losses() {
        let config = EngineConfig::default();
        let result = loan_ecl(
            &loan("W", "Retail", dec!(0.03), dec!(0.06), dec!(750_000), dec!(0.025), 84),
            &config,
        )
        .unwrap();

        let recomputed: Decimal = config
            .scenarios
            .scenarios
            .iter()
            .zip(result.scenario_ecl.iter())
            .map(|(s, e)| s.weight * e.ecl)
            .sum();
        assert_eq!(result.weighted_ecl, recomputed.round_dp(2));
    }

    #[test]
    fn test_portfolio_rollups() {
        let output = compute_portfolio_ecl(&sample_portfolio(), &EngineConfig::default()).unwrap();
        let result = &output.result;

        assert_eq!(
            result.stage_counts,
            StageCounts {
                stage_1: 1,
                stage_2: 1,
                stage_3: 1,
            }
        );
        assert_eq!(result.total_ead, dec!(700_000));

        let summed: Decimal = result.results.iter().map(|r| r.weighted_ecl).sum();
        assert_eq!(result.total_weighted_ecl, summed);

        // Sectors come back sorted by name
        let sectors: Vec<&str> = result
            .sector_coverage
            .iter()
            .map(|c| c.sector.as_str())
            .collect();
        assert_eq!(sectors, vec!["Corporate", "Retail", "SME"]);

        for coverage in &result.sector_coverage {
            assert_eq!(
                coverage.coverage_ratio,
                coverage.total_ecl / coverage.total_ead
            );
        }
    }

    #[test]
    fn test_loan_order_does_not_affect_per_loan_results() {
        let portfolio = sample_portfolio();
        let mut reversed = portfolio.clone();
        reversed.reverse();

        let config = EngineConfig::default();
        let forward = compute_portfolio_ecl(&portfolio, &config).unwrap();
        let backward = compute_portfolio_ecl(&reversed, &config).unwrap();

        for result in &forward.result.results {
            let twin = backward
                .result
                .results
                .iter()
                .find(|r| r.loan_id == result.loan_id)
                .unwrap();
            assert_eq!(result.weighted_ecl, twin.weighted_ecl);
            assert_eq!(result.stage, twin.stage);
        }
        assert_eq!(
            forward.result.total_weighted_ecl,
            backward.result.total_weighted_ecl
        );
    }

    #[test]
    fn test_base_pipeline_is_idempotent() {
        let portfolio = sample_portfolio();
        let config = EngineConfig::default();
        let first = compute_portfolio_ecl(&portfolio, &config).unwrap();
        let second = compute_portfolio_ecl(&portfolio, &config).unwrap();
        assert_eq!(
            serde_json::to_value(&first.result).unwrap(),
            serde_json::to_value(&second.result).unwrap()
        );
    }

    #[test]
    fn test_stress_never_decreases_total_ecl() {
        let portfolio = sample_portfolio();
        let shock = StressShock::new(dec!(2.0), dec!(1.2));
        let run = run_portfolio(&portfolio, &EngineConfig::default(), Some(&shock)).unwrap();
        let stressed = run.stressed.unwrap();
        assert!(stressed.result.total_weighted_ecl >= run.base.result.total_weighted_ecl);
        // the shock pushes the SICR loan over the default threshold
        assert!(stressed.result.stage_counts.stage_3 >= run.base.result.stage_counts.stage_3);
    }

    #[test]
    fn test_marginal_shock_across_sicr_boundary_does_not_decrease_ecl() {
        // A 1% PD shock tips the ratio just past 3.0, flipping the loan from
        // Stage 1 to Stage 2 and the horizon from 12 months to ten years. The
        // lifetime summation must keep the stressed ECL at or above the base.
        let portfolio = vec![loan(
            "L010",
            "Corporate",
            dec!(0.10),
            dec!(0.299),
            dec!(1_000_000),
            dec!(0.05),
            120,
        )];
        let shock = StressShock::new(dec!(1.01), dec!(1.0));
        let run = run_portfolio(&portfolio, &EngineConfig::default(), Some(&shock)).unwrap();
        let stressed = run.stressed.unwrap();

        assert_eq!(run.base.result.stage_counts.stage_1, 1);
        assert_eq!(stressed.result.stage_counts.stage_2, 1);
        assert!(
            stressed.result.total_weighted_ecl >= run.base.result.total_weighted_ecl,
            "stage flip decreased ECL: base {} -> stressed {}",
            run.base.result.total_weighted_ecl,
            stressed.result.total_weighted_ecl
        );
    }

    #[test]
    fn test_zero_exposure_sector_has_zero_coverage_and_warns() {
        let portfolio = vec![
            loan("L020", "Undrawn", dec!(0.02), dec!(0.03), Decimal::ZERO, dec!(0.02), 36),
            loan("L021", "Retail", dec!(0.02), dec!(0.02), dec!(100_000), dec!(0), 60),
        ];

        let output = compute_portfolio_ecl(&portfolio, &EngineConfig::default()).unwrap();
        let undrawn = output
            .result
            .sector_coverage
            .iter()
            .find(|c| c.sector == "Undrawn")
            .unwrap();
        assert_eq!(undrawn.total_ead, Decimal::ZERO);
        assert_eq!(undrawn.total_ecl, Decimal::ZERO);
        assert_eq!(undrawn.coverage_ratio, Decimal::ZERO);
        assert!(output
            .warnings
            .iter()
            .any(|w| w.contains("Undrawn") && w.contains("zero exposure")));
    }

    #[test]
    fn test_run_without_shock_has_no_stressed_result() {
        let run = run_portfolio(&sample_portfolio(), &EngineConfig::default(), None).unwrap();
        assert!(run.stressed.is_none());
    }

    #[test]
    fn test_out_of_range_pd_rejected_with_loan_id() {
        let mut portfolio = sample_portfolio();
        portfolio[1].current_pd = dec!(1.2);
        let err = compute_portfolio_ecl(&portfolio, &EngineConfig::default()).unwrap_err();
        match err {
            Ifrs9Error::Range { loan_id, field, .. } => {
                assert_eq!(loan_id, "L002");
                assert_eq!(field, "current_pd");
            }
            other => panic!("Expected Range error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_ead_rejected() {
        let mut portfolio = sample_portfolio();
        portfolio[0].ead = dec!(-1);
        let err = compute_portfolio_ecl(&portfolio, &EngineConfig::default()).unwrap_err();
        match err {
            Ifrs9Error::Range { field, .. } => assert_eq!(field, "ead"),
            other => panic!("Expected Range error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_loan_id_rejected() {
        let mut portfolio = sample_portfolio();
        portfolio[2].loan_id = "L001".into();
        let err = compute_portfolio_ecl(&portfolio, &EngineConfig::default()).unwrap_err();
        match err {
            Ifrs9Error::Schema { column, .. } => assert_eq!(column, "loan_id"),
            other => panic!("Expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_scenario_weights_fail_before_computation() {
        let config = EngineConfig {
            staging: StagingConfig::default(),
            scenarios: ScenarioSet::new(vec![
                ScenarioDefinition::new("Base", dec!(1.0), dec!(0.7)),
                ScenarioDefinition::new("Downturn", dec!(1.5), dec!(0.7)),
            ]),
        };
        let err = compute_portfolio_ecl(&sample_portfolio(), &config).unwrap_err();
        match err {
            Ifrs9Error::Config { field, .. } => assert_eq!(field, "weights"),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_reject_policy_fails_validation_before_results() {
        let mut portfolio = sample_portfolio();
        portfolio[0].initial_pd = Decimal::ZERO;
        let config = EngineConfig {
            staging: StagingConfig {
                zero_initial_pd: ZeroInitialPdPolicy::Reject,
                ..StagingConfig::default()
            },
            scenarios: ScenarioSet::baseline(),
        };
        let err = compute_portfolio_ecl(&portfolio, &config).unwrap_err();
        match err {
            Ifrs9Error::Policy { loan_id, .. } => assert_eq!(loan_id, "L001"),
            other => panic!("Expected Policy error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_portfolio_warns_and_returns_zero_rollups() {
        let output = compute_portfolio_ecl(&[], &EngineConfig::default()).unwrap();
        assert!(output.warnings.iter().any(|w| w.contains("empty")));
        assert_eq!(output.result.total_weighted_ecl, Decimal::ZERO);
        assert_eq!(output.result.stage_counts, StageCounts::default());
    }

    #[test]
    fn test_custom_scenario_set_flows_through() {
        let config = EngineConfig {
            staging: StagingConfig::default(),
            scenarios: ScenarioSet::new(vec![
                ScenarioDefinition::new("Mild", dec!(0.9), dec!(0.5)),
                ScenarioDefinition::new("Severe", dec!(2.0), dec!(0.5)),
            ]),
        };
        let result = loan_ecl(
            &loan("S", "Retail", dec!(0.05), dec!(0.05), dec!(100_000), dec!(0), 60),
            &config,
        )
        .unwrap();
        assert_eq!(result.scenario_ecl.len(), 2);
        // Mild: 0.045*0.45*100k = 2025; Severe: 0.10*0.45*100k = 4500
        assert_eq!(result.weighted_ecl, dec!(3262.50));
    }
}
