use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::Ifrs9Error;
use crate::types::Rate;
use crate::Ifrs9Result;

/// Tolerance on the scenario weight sum.
const WEIGHT_TOLERANCE: Decimal = dec!(0.001);

/// A single macroeconomic scenario: a PD multiplier and its probability weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub name: String,
    /// Positive scalar applied to the loan's current PD.
    pub pd_multiplier: Rate,
    /// Probability weight in [0, 1].
    pub weight: Rate,
}

impl ScenarioDefinition {
    pub fn new(name: &str, pd_multiplier: Decimal, weight: Decimal) -> Self {
        Self {
            name: name.to_string(),
            pd_multiplier,
            weight,
        }
    }
}

/// The full scenario set used for a run. Engine configuration, not module state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub scenarios: Vec<ScenarioDefinition>,
}

impl ScenarioSet {
    pub fn new(scenarios: Vec<ScenarioDefinition>) -> Self {
        Self { scenarios }
    }

    /// The reference three-scenario set: Optimistic ×0.80 (30%),
    /// Base ×1.00 (40%), Downturn ×1.50 (30%).
    pub fn baseline() -> Self {
        Self::new(vec![
            ScenarioDefinition::new("Optimistic", dec!(0.80), dec!(0.30)),
            ScenarioDefinition::new("Base", dec!(1.00), dec!(0.40)),
            ScenarioDefinition::new("Downturn", dec!(1.50), dec!(0.30)),
        ])
    }

    /// Validate the set: non-empty, unique names, positive multipliers,
    /// weights in [0, 1] summing to 1.0 within tolerance.
    pub fn validate(&self) -> Ifrs9Result<()> {
        if self.scenarios.is_empty() {
            return Err(Ifrs9Error::Config {
                field: "scenarios".into(),
                reason: "At least one scenario is required".into(),
            });
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for s in &self.scenarios {
            if !seen.insert(s.name.as_str()) {
                return Err(Ifrs9Error::Config {
                    field: format!("scenario:{}", s.name),
                    reason: "Scenario names must be unique".into(),
                });
            }
            if s.pd_multiplier <= Decimal::ZERO {
                return Err(Ifrs9Error::Config {
                    field: format!("scenario:{} pd_multiplier", s.name),
                    reason: format!("Multiplier must be positive (got {})", s.pd_multiplier),
                });
            }
            if s.weight < Decimal::ZERO || s.weight > Decimal::ONE {
                return Err(Ifrs9Error::Config {
                    field: format!("scenario:{} weight", s.name),
                    reason: format!("Weight must be between 0 and 1 (got {})", s.weight),
                });
            }
        }

        let total_weight: Decimal = self.scenarios.iter().map(|s| s.weight).sum();
        if (total_weight - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
            return Err(Ifrs9Error::Config {
                field: "weights".into(),
                reason: format!("Scenario weights must sum to 1.0 (got {total_weight})"),
            });
        }

        Ok(())
    }
}

/// Scenario-adjusted PD, clamped to [0, 1] even after multiplication.
pub fn adjusted_pd(current_pd: Rate, scenario: &ScenarioDefinition) -> Rate {
    (current_pd * scenario.pd_multiplier).min(Decimal::ONE)
}
