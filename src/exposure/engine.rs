//! ExposureEngine - facade over the ingest → aggregate → detect → publish cycle

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{ExpirySlice, ExposureCurve, ExposureCurveBuilder, GammaFlipDetector};
use crate::book::{BookState, BookVersion, BookView, DealerBook, IncrementalOutcome, IngestReport, SharedDealerBook};
use crate::core::{ContractSnapshot, EngineConfig, ExposureError, ExposureResult};
use crate::data::{ChainSnapshot, ExposureSeriesStore, SeriesEntry};

/// Result of one recompute cycle
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// A new entry was appended to the series
    Published(Arc<SeriesEntry>),
    /// The book version was already published; nothing appended
    Unchanged(BookVersion),
}

impl CycleOutcome {
    pub fn version(&self) -> BookVersion {
        match self {
            CycleOutcome::Published(entry) => entry.version,
            CycleOutcome::Unchanged(version) => *version,
        }
    }

    pub fn published(&self) -> Option<&Arc<SeriesEntry>> {
        match self {
            CycleOutcome::Published(entry) => Some(entry),
            CycleOutcome::Unchanged(_) => None,
        }
    }
}

/// Single-producer pipeline owning the book and the published series.
///
/// Ingest calls are expected from one worker; views, curves and the series
/// can be read from anywhere through cloned handles.
pub struct ExposureEngine {
    config: EngineConfig,
    book: SharedDealerBook,
    builder: ExposureCurveBuilder,
    detector: GammaFlipDetector,
    store: ExposureSeriesStore,
    publish_lock: Mutex<()>,
}

impl ExposureEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            book: SharedDealerBook::new(DealerBook::from_config(&config)),
            builder: ExposureCurveBuilder::from_config(&config.curve),
            detector: GammaFlipDetector::new(config.flip),
            store: ExposureSeriesStore::new(),
            publish_lock: Mutex::new(()),
            config,
        }
    }

    /// Validate the configuration before building the engine
    pub fn try_with_config(config: EngineConfig) -> ExposureResult<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared handle to the book, for readers
    pub fn book(&self) -> &SharedDealerBook {
        &self.book
    }

    /// Shared handle to the series, for consumers
    pub fn store(&self) -> &ExposureSeriesStore {
        &self.store
    }

    pub fn snapshot_view(&self) -> BookView {
        self.book.snapshot_view()
    }

    pub fn latest(&self) -> Option<Arc<SeriesEntry>> {
        self.store.latest()
    }

    /// Full resync from a chain snapshot
    pub fn ingest_snapshot(&self, contracts: &[ContractSnapshot]) -> IngestReport {
        self.book.write(|book| book.replace_snapshot(contracts))
    }

    /// Full resync from a chain source pull; malformed source records count
    /// as skipped in the report
    pub fn ingest_chain(&self, chain: &ChainSnapshot) -> IngestReport {
        if !chain.malformed.is_empty() {
            tracing::warn!("Chain had {} malformed records", chain.malformed.len());
        }
        let mut report = self.ingest_snapshot(&chain.contracts);
        report.malformed = chain.malformed.clone();
        report
    }

    pub fn apply_incremental(&self, contract: &ContractSnapshot) -> ExposureResult<IncrementalOutcome> {
        self.book.write(|book| book.apply_incremental(contract))
    }

    pub fn reset(&self) {
        self.book.write(|book| book.reset());
    }

    /// Delete entries outside the configured staleness window; no window, no-op
    pub fn prune_stale(&self, as_of: DateTime<Utc>) -> usize {
        match self.config.curve.staleness_window() {
            Some(window) => self.book.write(|book| book.prune_stale(as_of, window)),
            None => 0,
        }
    }

    /// Curve of the current book under the configured filter and bucketing
    pub fn current_curve(&self, as_of: DateTime<Utc>) -> ExposureResult<ExposureCurve> {
        let view = self.book.snapshot_view();
        self.builder.build_curve(
            &view,
            &self.config.curve.expiry_filter,
            &self.config.curve.bucketing,
            as_of,
        )
    }

    pub fn expiry_slices(&self, as_of: DateTime<Utc>) -> ExposureResult<Vec<ExpirySlice>> {
        let view = self.book.snapshot_view();
        self.builder
            .build_expiry_slices(&view, &self.config.curve.bucketing, as_of)
    }

    /// Build, detect and publish for the current book version.
    ///
    /// Curve and flip both come from one view, so a published entry always
    /// matches exactly one book version. Recomputing an already-published
    /// version appends nothing.
    pub fn recompute(&self, underlying_price: f64, as_of: DateTime<Utc>) -> ExposureResult<CycleOutcome> {
        if !underlying_price.is_finite() || underlying_price <= 0.0 {
            return Err(ExposureError::invalid_input(format!(
                "underlying price must be positive, got {}",
                underlying_price
            )));
        }

        let _publish = self.publish_lock.lock();
        let view = self.book.snapshot_view();
        let version = view.version();
        if view.state() == BookState::Empty {
            return Err(ExposureError::EmptyBook);
        }

        if self.store.latest_version().map_or(false, |last| last >= version) {
            tracing::debug!("Book {} already published, skipping recompute", version);
            return Ok(CycleOutcome::Unchanged(version));
        }

        let curve = self.builder.build_curve(
            &view,
            &self.config.curve.expiry_filter,
            &self.config.curve.bucketing,
            as_of,
        )?;
        let flip = self.detector.detect_flip(&curve, underlying_price);

        tracing::info!(
            "Publishing {}: {} strikes, net gamma {:.2}, net GEX {:.0} | {}",
            version,
            curve.len(),
            curve.total_gamma(),
            curve.total_gex(),
            flip.summary()
        );

        let entry = self.store.append(version, curve, flip, as_of)?;
        Ok(CycleOutcome::Published(entry))
    }
}

impl Default for ExposureEngine {
    fn default() -> Self {
        Self::new()
    }
}
