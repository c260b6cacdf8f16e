use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Ifrs9Error;
use crate::types::{LoanRecord, Rate};
use crate::Ifrs9Result;

/// Systemic shock applied to every loan before the ECL pipeline runs.
///
/// Explicit configuration: a stressed run is the same pure pipeline invoked on
/// a shocked copy of the portfolio, never a hidden mode switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressShock {
    /// Multiplier applied to current_pd (result clamped to [0, 1]).
    pub pd_multiplier: Rate,
    /// Multiplier applied to lgd (result clamped to [0, 1]).
    #[serde(default = "default_lgd_multiplier")]
    pub lgd_multiplier: Rate,
}

fn default_lgd_multiplier() -> Decimal {
    Decimal::ONE
}

impl StressShock {
    pub fn new(pd_multiplier: Decimal, lgd_multiplier: Decimal) -> Self {
        Self {
            pd_multiplier,
            lgd_multiplier,
        }
    }

    pub fn validate(&self) -> Ifrs9Result<()> {
        if self.pd_multiplier <= Decimal::ZERO {
            return Err(Ifrs9Error::Config {
                field: "shock.pd_multiplier".into(),
                reason: format!("Multiplier must be positive (got {})", self.pd_multiplier),
            });
        }
        if self.lgd_multiplier <= Decimal::ZERO {
            return Err(Ifrs9Error::Config {
                field: "shock.lgd_multiplier".into(),
                reason: format!("Multiplier must be positive (got {})", self.lgd_multiplier),
            });
        }
        Ok(())
    }
}

/// Produce a shocked copy of the portfolio. The base records are untouched, so
/// base and stressed results can be computed side by side for comparison.
pub fn apply_shock(portfolio: &[LoanRecord], shock: &StressShock) -> Vec<LoanRecord> {
    portfolio
        .iter()
        .map(|loan| LoanRecord {
            current_pd: (loan.current_pd * shock.pd_multiplier).min(Decimal::ONE),
            lgd: (loan.lgd * shock.lgd_multiplier).min(Decimal::ONE),
            ..loan.clone()
        })
        .collect()
}
