use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::Ifrs9Error;
use crate::types::{LoanRecord, Rate, Stage};
use crate::Ifrs9Result;

/// Policy for loans whose initial PD is zero, where the SICR ratio is undefined.
///
/// IFRS 9 does not define this case; the choice must be explicit configuration
/// rather than an implicit arithmetic outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroInitialPdPolicy {
    /// Any positive current PD counts as a significant increase (Stage 2);
    /// a zero current PD stays in Stage 1.
    #[default]
    TreatAsSicr,
    /// Stage 1 unless the current PD breaches the default threshold.
    TreatAsPerforming,
    /// Refuse the portfolio during validation.
    Reject,
}

/// Thresholds driving stage assignment. Passed in per run, never module state,
/// so concurrent runs with different thresholds cannot interfere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Current PD strictly above this is Stage 3 (default).
    pub default_threshold: Rate,
    /// current_pd / initial_pd strictly above this is Stage 2 (SICR).
    pub sicr_ratio: Rate,
    #[serde(default)]
    pub zero_initial_pd: ZeroInitialPdPolicy,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            default_threshold: dec!(0.5),
            sicr_ratio: dec!(3.0),
            zero_initial_pd: ZeroInitialPdPolicy::default(),
        }
    }
}

/// Assign an IFRS 9 stage from the loan's PD pair.
///
/// Rules, evaluated in order:
///   - Stage 3 if current_pd > default_threshold (strict)
///   - Stage 2 if current_pd / initial_pd > sicr_ratio (strict)
///   - Stage 1 otherwise
///
/// Pure function of (initial_pd, current_pd) and the config; errs only when
/// initial_pd is zero under `ZeroInitialPdPolicy::Reject`, which portfolio
/// validation surfaces before any computation begins.
pub fn classify(loan: &LoanRecord, config: &StagingConfig) -> Ifrs9Result<Stage> {
    if loan.current_pd > config.default_threshold {
        return Ok(Stage::Three);
    }

    if loan.initial_pd.is_zero() {
        return match config.zero_initial_pd {
            ZeroInitialPdPolicy::TreatAsSicr => {
                if loan.current_pd > Decimal::ZERO {
                    Ok(Stage::Two)
                } else {
                    Ok(Stage::One)
                }
            }
            ZeroInitialPdPolicy::TreatAsPerforming => Ok(Stage::One),
            ZeroInitialPdPolicy::Reject => Err(Ifrs9Error::Policy {
                loan_id: loan.loan_id.clone(),
                reason: "initial_pd is zero; SICR ratio is undefined".into(),
            }),
        };
    }

    if loan.current_pd / loan.initial_pd > config.sicr_ratio {
        return Ok(Stage::Two);
    }

    Ok(Stage::One)
}
