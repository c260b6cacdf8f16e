use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates and probabilities expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// IFRS 9 credit stage. Derived from PD inputs, never stored as authoritative input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Stage {
    One,
    Two,
    Three,
}

impl Stage {
    pub fn as_u8(self) -> u8 {
        match self {
            Stage::One => 1,
            Stage::Two => 2,
            Stage::Three => 3,
        }
    }

    /// True when the stage requires a lifetime ECL horizon.
    pub fn is_lifetime(self) -> bool {
        !matches!(self, Stage::One)
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> u8 {
        stage.as_u8()
    }
}

impl TryFrom<u8> for Stage {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Stage::One),
            2 => Ok(Stage::Two),
            3 => Ok(Stage::Three),
            other => Err(format!("Stage must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A single loan as supplied by the portfolio source. Read-only engine input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: String,
    pub sector: String,
    /// PD fixed at origination
    pub initial_pd: Rate,
    /// PD as currently assessed
    pub current_pd: Rate,
    /// Loss given default, fraction of EAD
    pub lgd: Rate,
    /// Exposure at default
    pub ead: Money,
    /// Effective interest rate used for discounting
    pub eir: Rate,
    pub remaining_term_months: u32,
}

/// ECL for one loan under one macroeconomic scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioEcl {
    pub scenario: String,
    pub ecl: Money,
}

/// Per-loan engine output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanEcl {
    pub loan_id: String,
    pub sector: String,
    pub stage: Stage,
    pub scenario_ecl: Vec<ScenarioEcl>,
    pub weighted_ecl: Money,
    pub horizon_months: u32,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
