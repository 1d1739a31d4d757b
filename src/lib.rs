//! # Dealer Exposure - Dealer inventory and Greek exposure engine
//!
//! Maintains a versioned book of dealer-attributed option exposure and derives
//! strike-axis Gamma/Vanna/Charm curves and the Gamma Flip level from it.
//!
//! ## Overview
//!
//! Each cycle runs one pipeline:
//! - **Greeks**: closed-form Black-Scholes delta, gamma, vanna, charm per contract
//! - **Dealer convention**: an injectable assumption signing each contract into
//!   dealer exposure (short calls / long puts by default)
//! - **Dealer book**: keyed, versioned store with full resync and incremental updates
//! - **Curves**: per-strike aggregation with expiry filtering and staleness exclusion
//! - **Gamma Flip**: interpolated zero crossing of net dealer gamma
//! - **Series**: append-only history of every published result
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dealer_exposure::prelude::*;
//! use chrono::Utc;
//!
//! let engine = ExposureEngine::new();
//! let mut source = SyntheticChainSource::new(42);
//!
//! let chain = source.fetch(Utc::now()).unwrap();
//! engine.ingest_chain(&chain);
//!
//! if let CycleOutcome::Published(entry) = engine.recompute(chain.underlying_price, Utc::now()).unwrap() {
//!     println!("{}", entry.flip.summary());
//! }
//! ```
//!
//! ## What This Engine Does NOT Do
//!
//! - Fetch market data (sources are plugged in through [`data::ChainSource`])
//! - Forecast prices or generate trading signals
//! - Persist the series beyond the process lifetime

pub mod book;
pub mod core;
pub mod data;
pub mod exposure;
pub mod models;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        ContractKey, ContractRecord, ContractSnapshot, CustomerFlow, EngineConfig, ExposureError,
        ExposureResult, GreekSet, OptionType, ValidationError,
    };

    // Models
    pub use crate::models::{DayCount, DealerConvention, GreekCalculator, Side};

    // Book
    pub use crate::book::{
        BookEntry, BookState, BookVersion, BookView, DealerAttributedExposure, DealerBook,
        IncrementalOutcome, IngestReport, SharedDealerBook,
    };

    // Curves and flip
    pub use crate::exposure::{
        CurveConfig, CycleOutcome, ExpiryFilter, ExpirySlice, ExposureCurve, ExposureCurveBuilder,
        ExposureCurvePoint, ExposureEngine, FlipBasis, FlipConfig, FlipMethod, GammaFlipDetector,
        GammaFlipResult, GammaRegime, StrikeBucketing,
    };

    // Data boundary
    pub use crate::data::{
        parse_records, ChainSnapshot, ChainSource, ExposureSeriesStore, RecordFileSource,
        SeriesEntry, SyntheticChainConfig, SyntheticChainSource,
    };
}

// Re-export main types at crate root
pub use crate::core::{EngineConfig, ExposureError, ExposureResult};
pub use crate::exposure::ExposureEngine;
