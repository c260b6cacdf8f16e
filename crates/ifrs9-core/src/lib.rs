pub mod discount;
pub mod ecl;
pub mod error;
pub mod scenarios;
pub mod staging;
pub mod stress;
pub mod types;

#[cfg(feature = "synthetic")]
pub mod synthetic;

pub use error::Ifrs9Error;
pub use types::*;

/// Standard result type for all engine operations
pub type Ifrs9Result<T> = Result<T, Ifrs9Error>;
