use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use ifrs9_core::{Ifrs9Error, LoanRecord};

/// Columns the portfolio CSV must carry, in any order.
const REQUIRED_COLUMNS: [&str; 8] = [
    "loan_id",
    "sector",
    "initial_pd",
    "current_pd",
    "lgd",
    "ead",
    "eir",
    "remaining_term_months",
];

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Load a portfolio CSV, reporting missing columns and bad rows by name.
pub fn read_portfolio_csv(path: &str) -> Result<Vec<LoanRecord>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let mut reader = csv::Reader::from_path(&canonical)
        .map_err(|e| format!("Failed to open '{}': {}", canonical.display(), e))?;

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(Box::new(Ifrs9Error::Schema {
                column: column.to_string(),
                reason: format!("Missing column in '{}'", canonical.display()),
            }));
        }
    }

    let mut portfolio = Vec::new();
    for (row, record) in reader.deserialize::<LoanRecord>().enumerate() {
        let loan = record.map_err(|e| format!("Row {}: {}", row + 2, e))?;
        portfolio.push(loan);
    }
    Ok(portfolio)
}

/// Resolve and validate the path.
fn resolve_path(path: &str) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }
    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
