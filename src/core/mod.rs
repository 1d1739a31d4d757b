//! Core data types for the exposure engine
//!
//! Defines fundamental types:
//! - ContractSnapshot / ContractKey: one option contract and its book key
//! - GreekSet: per-contract sensitivities
//! - EngineConfig: engine-wide settings
//! - ExposureError / ValidationError

pub mod config;
pub mod error;
pub mod greeks;
pub mod option;

pub use config::*;
pub use error::*;
pub use greeks::*;
pub use option::*;
