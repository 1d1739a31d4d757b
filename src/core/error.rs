//! Error types for the exposure engine

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::option::ContractKey;

/// Per-contract validation failure.
///
/// These never abort a batch: the offending contract is skipped and the
/// failure is reported back to the caller alongside the accepted count.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("non-positive strike {strike}")]
    NonPositiveStrike { strike: String },

    #[error("non-positive implied volatility {value} for {key}")]
    NonPositiveImpliedVol { key: ContractKey, value: f64 },

    #[error("negative open interest {value} for {key}")]
    NegativeOpenInterest { key: ContractKey, value: i64 },

    #[error("negative volume {value} for {key}")]
    NegativeVolume { key: ContractKey, value: i64 },

    #[error("non-positive underlying price {value} for {key}")]
    NonPositiveUnderlying { key: ContractKey, value: f64 },

    #[error("non-finite {field} for {key}")]
    NonFinite { key: ContractKey, field: &'static str },

    #[error("malformed expiry '{0}'")]
    MalformedExpiry(String),

    #[error("unknown option type '{0}'")]
    UnknownOptionType(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

#[derive(Error, Debug)]
pub enum ExposureError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stale update for {key}: incoming {incoming} is older than stored {stored}")]
    StaleOrdering {
        key: ContractKey,
        stored: DateTime<Utc>,
        incoming: DateTime<Utc>,
    },

    #[error("Dealer book is empty")]
    EmptyBook,

    #[error("Version regression: last published {last}, attempted {attempted}")]
    VersionRegression { last: u64, attempted: u64 },

    #[error("Timestamp regression: last published {last}, attempted {attempted}")]
    TimestampRegression {
        last: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type ExposureResult<T> = Result<T, ExposureError>;

impl ExposureError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// True for failures that only mean "no result this cycle"
    pub fn is_no_data(&self) -> bool {
        matches!(self, ExposureError::EmptyBook)
    }
}
