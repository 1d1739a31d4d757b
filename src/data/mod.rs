//! Data boundary
//!
//! Handles:
//! - Chain sources: anything that emits contract snapshots plus an underlying price
//! - JSON contract records from external collaborators
//! - The append-only exposure series consumed downstream

pub mod records;
pub mod series;
pub mod synthetic;

pub use records::*;
pub use series::*;
pub use synthetic::*;

use chrono::{DateTime, Utc};

use crate::core::{ContractSnapshot, ExposureResult, ValidationError};

/// One pull from a chain source
#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    pub as_of: DateTime<Utc>,
    pub underlying_price: f64,
    pub contracts: Vec<ContractSnapshot>,
    /// Records that could not be turned into snapshots at all
    pub malformed: Vec<ValidationError>,
}

/// Producer of option chains; the engine treats every source the same
pub trait ChainSource {
    fn name(&self) -> &str;

    fn fetch(&mut self, as_of: DateTime<Utc>) -> ExposureResult<ChainSnapshot>;
}
