use thiserror::Error;

#[derive(Debug, Error)]
pub enum Ifrs9Error {
    #[error("Schema error: {column} — {reason}")]
    Schema { column: String, reason: String },

    #[error("Range error on loan '{loan_id}': {field} — {reason}")]
    Range {
        loan_id: String,
        field: String,
        reason: String,
    },

    #[error("Config error: {field} — {reason}")]
    Config { field: String, reason: String },

    #[error("Policy error on loan '{loan_id}': {reason}")]
    Policy { loan_id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Ifrs9Error {
    fn from(e: serde_json::Error) -> Self {
        Ifrs9Error::Serialization(e.to_string())
    }
}
