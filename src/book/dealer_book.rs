//! DealerBook - keyed store of dealer-attributed exposure
//!
//! Entries live in an `Arc`'d ordered map that is copied on write, so a
//! [`BookView`] handed to readers is an immutable snapshot of exactly one
//! version, no matter what the single writer does afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use super::{BookEntry, BookState, BookVersion, DealerAttributedExposure};
use crate::core::{ContractKey, ContractSnapshot, EngineConfig, ExposureError, ExposureResult, ValidationError};
use crate::models::{DealerConvention, GreekCalculator};

/// A contract rejected during ingest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedContract {
    pub key: ContractKey,
    #[serde(serialize_with = "serialize_display")]
    pub error: ValidationError,
}

fn serialize_display<S: serde::Serializer>(
    error: &ValidationError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

fn serialize_display_all<S: serde::Serializer>(
    errors: &[ValidationError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

/// Outcome of a full snapshot replace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    /// Book version after the replace
    pub version: BookVersion,
    /// Contracts stored
    pub accepted: usize,
    /// Valid contracts dropped because the batch held a newer one for the same key
    pub superseded: usize,
    pub rejected: Vec<RejectedContract>,
    /// Source records that never parsed into a contract, so carry no key
    #[serde(serialize_with = "serialize_display_all")]
    pub malformed: Vec<ValidationError>,
}

impl IngestReport {
    /// Rejected contracts plus malformed source records
    pub fn skipped(&self) -> usize {
        self.rejected.len() + self.malformed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.malformed.is_empty()
    }
}

/// Outcome of a single incremental update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementalOutcome {
    /// New key
    Inserted,
    /// Existing key replaced by a different entry
    Updated,
    /// Identical to the stored entry; version not bumped
    Unchanged,
}

/// Immutable snapshot of the book at one version
#[derive(Debug, Clone)]
pub struct BookView {
    version: BookVersion,
    state: BookState,
    entries: Arc<BTreeMap<ContractKey, BookEntry>>,
}

impl BookView {
    pub fn version(&self) -> BookVersion {
        self.version
    }

    pub fn state(&self) -> BookState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ContractKey) -> Option<&BookEntry> {
        self.entries.get(key)
    }

    /// Entries in key order (strike, expiry, type)
    pub fn entries(&self) -> impl Iterator<Item = &BookEntry> + '_ {
        self.entries.values()
    }

    /// Distinct expiries present, ascending
    pub fn expiries(&self) -> Vec<NaiveDate> {
        let mut expiries: Vec<NaiveDate> = self.entries.keys().map(|k| k.expiry).collect();
        expiries.sort();
        expiries.dedup();
        expiries
    }
}

/// Stateful aggregator of dealer-attributed exposure
#[derive(Debug, Clone)]
pub struct DealerBook {
    calculator: GreekCalculator,
    convention: DealerConvention,
    contract_multiplier: f64,
    entries: Arc<BTreeMap<ContractKey, BookEntry>>,
    version: BookVersion,
    state: BookState,
}

impl DealerBook {
    pub fn new(
        calculator: GreekCalculator,
        convention: DealerConvention,
        contract_multiplier: f64,
    ) -> Self {
        Self {
            calculator,
            convention,
            contract_multiplier,
            entries: Arc::new(BTreeMap::new()),
            version: BookVersion::default(),
            state: BookState::Empty,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            GreekCalculator::from_config(config),
            config.convention,
            config.contract_multiplier,
        )
    }

    pub fn version(&self) -> BookVersion {
        self.version
    }

    pub fn state(&self) -> BookState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &ContractKey) -> Option<&BookEntry> {
        self.entries.get(key)
    }

    /// Validate one contract and attribute its Greeks to dealers
    pub fn attribute(&self, contract: &ContractSnapshot) -> ExposureResult<BookEntry> {
        contract.validate()?;

        let raw = self.calculator.compute_greeks(contract)?;
        let spot = contract.underlying_price;
        let weight = contract.open_interest as f64
            * self.contract_multiplier
            * self.convention.weight(contract);

        Ok(BookEntry {
            exposure: DealerAttributedExposure {
                key: contract.key(),
                raw,
                greeks: raw.scale(weight),
                weight,
                open_interest: contract.open_interest,
                underlying_price: spot,
                gex: raw.gamma * weight * spot * spot * 0.01,
                notional: weight.abs() * spot,
            },
            source_timestamp: contract.timestamp,
        })
    }

    /// Clear the book and rebuild it from a full chain snapshot.
    ///
    /// Invalid contracts are skipped and reported; when a key appears more
    /// than once the newest timestamp wins (later position on ties).
    pub fn replace_snapshot(&mut self, contracts: &[ContractSnapshot]) -> IngestReport {
        let mut entries: BTreeMap<ContractKey, BookEntry> = BTreeMap::new();
        let mut rejected = Vec::new();
        let mut superseded = 0;

        for contract in contracts {
            let entry = match self.attribute(contract) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Rejected contract {}: {}", contract.key(), e);
                    rejected.push(RejectedContract {
                        key: contract.key(),
                        error: into_validation(e),
                    });
                    continue;
                }
            };

            match entries.get(&entry.key()) {
                Some(existing) if existing.source_timestamp > entry.source_timestamp => {
                    superseded += 1;
                }
                Some(_) => {
                    superseded += 1;
                    entries.insert(entry.key(), entry);
                }
                None => {
                    entries.insert(entry.key(), entry);
                }
            }
        }

        let accepted = entries.len();
        self.entries = Arc::new(entries);
        self.state = BookState::Ready;
        self.version = self.version.next();

        tracing::info!(
            "Full resync {}: {} contracts stored, {} superseded, {} rejected",
            self.version,
            accepted,
            superseded,
            rejected.len()
        );

        IngestReport {
            version: self.version,
            accepted,
            superseded,
            rejected,
            malformed: Vec::new(),
        }
    }

    /// Upsert one contract.
    ///
    /// Updates older than the stored entry are refused with
    /// `StaleOrdering` and leave the book untouched, as do invalid contracts.
    /// The version is bumped only when the stored entry actually changes.
    pub fn apply_incremental(
        &mut self,
        contract: &ContractSnapshot,
    ) -> ExposureResult<IncrementalOutcome> {
        let entry = match self.attribute(contract) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Rejected incremental update {}: {}", contract.key(), e);
                return Err(e);
            }
        };
        let key = entry.key();

        let outcome = match self.entries.get(&key) {
            Some(stored) if stored.source_timestamp > entry.source_timestamp => {
                tracing::warn!(
                    "Ignoring out-of-order update for {}: {} < {}",
                    key,
                    entry.source_timestamp,
                    stored.source_timestamp
                );
                return Err(ExposureError::StaleOrdering {
                    key,
                    stored: stored.source_timestamp,
                    incoming: entry.source_timestamp,
                });
            }
            Some(stored) if *stored == entry => IncrementalOutcome::Unchanged,
            Some(_) => IncrementalOutcome::Updated,
            None => IncrementalOutcome::Inserted,
        };

        if outcome != IncrementalOutcome::Unchanged {
            Arc::make_mut(&mut self.entries).insert(key, entry);
            self.version = self.version.next();
            if self.state == BookState::Empty {
                self.state = BookState::Partial;
            }
        }

        tracing::debug!("Incremental {} -> {:?} at {}", key, outcome, self.version);
        Ok(outcome)
    }

    /// Immutable copy of the current entries and version
    pub fn snapshot_view(&self) -> BookView {
        BookView {
            version: self.version,
            state: self.state,
            entries: Arc::clone(&self.entries),
        }
    }

    /// Drop every entry and return to `Empty`
    pub fn reset(&mut self) {
        self.entries = Arc::new(BTreeMap::new());
        self.state = BookState::Empty;
        self.version = self.version.next();
        tracing::info!("Dealer book reset at {}", self.version);
    }

    /// Delete entries older than `window` as of `as_of`; returns how many went
    pub fn prune_stale(&mut self, as_of: DateTime<Utc>, window: Duration) -> usize {
        let stale: Vec<ContractKey> = self
            .entries
            .values()
            .filter(|e| e.is_stale(as_of, Some(window)))
            .map(|e| e.key())
            .collect();

        if stale.is_empty() {
            return 0;
        }

        let entries = Arc::make_mut(&mut self.entries);
        for key in &stale {
            entries.remove(key);
        }
        self.version = self.version.next();

        tracing::info!("Pruned {} stale entries at {}", stale.len(), self.version);
        stale.len()
    }
}

/// Anything `attribute` rejects for is a per-contract validation failure
fn into_validation(error: ExposureError) -> ValidationError {
    match error {
        ExposureError::Validation(v) => v,
        // Greek calculation failures after validation only come from bad inputs
        other => ValidationError::MalformedRecord(other.to_string()),
    }
}
