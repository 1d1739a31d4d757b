//! JSON contract records
//!
//! Collaborators hand over chains as a JSON array of [`ContractRecord`]s.
//! Parsing is per record: one bad element never sinks the batch.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{ChainSnapshot, ChainSource};
use crate::core::{ContractRecord, ContractSnapshot, ExposureError, ExposureResult, ValidationError};

/// Parse a JSON array of contract records.
///
/// Fails only if the document is not a JSON array; each element gets its
/// own result.
pub fn parse_records(json: &str) -> ExposureResult<Vec<Result<ContractSnapshot, ValidationError>>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| ExposureError::serialization(format!("Failed to parse records: {}", e)))?;

    Ok(values
        .into_iter()
        .map(|value| {
            serde_json::from_value::<ContractRecord>(value)
                .map_err(|e| ValidationError::MalformedRecord(e.to_string()))
                .and_then(ContractSnapshot::try_from)
        })
        .collect())
}

/// Serialize snapshots back to the record wire form
pub fn to_records_json(contracts: &[ContractSnapshot]) -> ExposureResult<String> {
    let records: Vec<ContractRecord> = contracts.iter().map(ContractRecord::from).collect();
    serde_json::to_string_pretty(&records).map_err(|e| ExposureError::serialization(e.to_string()))
}

impl From<&ContractSnapshot> for ContractRecord {
    fn from(c: &ContractSnapshot) -> Self {
        Self {
            strike: c.strike,
            expiry: c.expiry.format("%Y-%m-%d").to_string(),
            option_type: c.option_type.to_string(),
            open_interest: c.open_interest,
            volume: c.volume,
            implied_vol: c.implied_vol,
            underlying_price: c.underlying_price,
            risk_free_rate: c.risk_free_rate,
            dividend_yield: c.dividend_yield,
            timestamp: c.timestamp,
            buy_to_open: c.customer_flow.map(|f| f.buy_to_open),
            sell_to_open: c.customer_flow.map(|f| f.sell_to_open),
        }
    }
}

/// Chain read from a JSON records file on every fetch
#[derive(Debug, Clone)]
pub struct RecordFileSource {
    path: PathBuf,
}

impl RecordFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChainSource for RecordFileSource {
    fn name(&self) -> &str {
        "records"
    }

    fn fetch(&mut self, as_of: DateTime<Utc>) -> ExposureResult<ChainSnapshot> {
        let json = fs::read_to_string(&self.path)?;

        let mut contracts = Vec::new();
        let mut malformed = Vec::new();
        for result in parse_records(&json)? {
            match result {
                Ok(c) => contracts.push(c),
                Err(e) => {
                    tracing::warn!("Skipping record in {:?}: {}", self.path, e);
                    malformed.push(e);
                }
            }
        }

        // Spot comes from the most recent record
        let underlying_price = contracts
            .iter()
            .max_by_key(|c| c.timestamp)
            .map(|c| c.underlying_price)
            .ok_or_else(|| {
                ExposureError::invalid_input(format!("no usable records in {:?}", self.path))
            })?;

        tracing::info!(
            "Loaded {} records from {:?} ({} malformed)",
            contracts.len(),
            self.path,
            malformed.len()
        );

        Ok(ChainSnapshot {
            as_of,
            underlying_price,
            contracts,
            malformed,
        })
    }
}
