//! Engine-wide configuration
//!
//! Everything the engine treats as a modeling or operational choice lives
//! here: contract multiplier, day count, dealer convention, staleness
//! window, default curve filter and flip settings. Loadable from TOML.

use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::error::{ExposureError, ExposureResult};
use crate::exposure::{CurveConfig, ExpiryFilter, FlipConfig, StrikeBucketing};
use crate::models::{DayCount, DealerConvention};

fn default_expiry_cutoff() -> NaiveTime {
    // 16:00 New York during daylight time
    NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Configuration for the exposure engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Units of underlying per contract
    /// Default: 100
    pub contract_multiplier: f64,

    /// Day count for time to expiry
    pub day_count: DayCount,

    /// Expiry time of day, UTC
    /// Default: 20:00:00
    pub expiry_cutoff: NaiveTime,

    /// Dealer positioning hypothesis
    /// Default: short calls, long puts
    pub convention: DealerConvention,

    pub curve: CurveConfig,

    pub flip: FlipConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contract_multiplier: 100.0,
            day_count: DayCount::Act365Fixed,
            expiry_cutoff: default_expiry_cutoff(),
            convention: DealerConvention::default(),
            curve: CurveConfig::default(),
            flip: FlipConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Same-day focus: nearest expiry only, entries stale after 5 minutes
    pub fn zero_dte() -> Self {
        Self {
            curve: CurveConfig {
                staleness_window_secs: Some(300),
                expiry_filter: ExpiryFilter::NearestExpiry,
                bucketing: StrikeBucketing::Exact,
            },
            ..Default::default()
        }
    }

    /// Dealer side inferred from customer open/close flow
    pub fn flow_weighted() -> Self {
        Self {
            convention: DealerConvention::customer_flow(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> ExposureResult<Self> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| ExposureError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ExposureResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> ExposureResult<String> {
        toml::to_string_pretty(self).map_err(|e| ExposureError::serialization(e.to_string()))
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> ExposureResult<()> {
        if !(self.contract_multiplier > 0.0) || !self.contract_multiplier.is_finite() {
            return Err(ExposureError::config(format!(
                "contract_multiplier must be positive, got {}",
                self.contract_multiplier
            )));
        }

        if let Some(secs) = self.curve.staleness_window_secs {
            if secs < 0 {
                return Err(ExposureError::config(format!(
                    "staleness_window_secs must be non-negative, got {}",
                    secs
                )));
            }
        }

        if let StrikeBucketing::Width { width } = self.curve.bucketing {
            if width <= rust_decimal::Decimal::ZERO {
                return Err(ExposureError::config(format!(
                    "bucket width must be positive, got {}",
                    width
                )));
            }
        }

        if let DealerConvention::Calibrated {
            call_weight,
            put_weight,
        } = self.convention
        {
            for w in [call_weight, put_weight] {
                if !(-1.0..=1.0).contains(&w) {
                    return Err(ExposureError::config(format!(
                        "calibrated dealer weight must be in [-1, 1], got {}",
                        w
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::{FlipBasis, FlipMethod};
    use crate::models::Side;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.contract_multiplier, 100.0);
        assert_eq!(config.expiry_cutoff, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert_eq!(config.convention, DealerConvention::short_calls_long_puts());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
            contract_multiplier = 50.0
            day_count = "act360"

            [convention]
            kind = "calibrated"
            call_weight = -0.6
            put_weight = 0.4

            [curve]
            staleness_window_secs = 900

            [curve.expiry_filter]
            kind = "expiries_within"
            days = 7

            [flip]
            basis = "cumulative"
        "#;

        let config = EngineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.contract_multiplier, 50.0);
        assert_eq!(config.day_count, DayCount::Act360);
        assert_eq!(config.convention, DealerConvention::calibrated(-0.6, 0.4));
        assert_eq!(config.curve.expiry_filter, ExpiryFilter::ExpiriesWithin { days: 7 });
        assert_eq!(config.curve.staleness_window().unwrap().num_minutes(), 15);
        assert_eq!(config.flip.basis, FlipBasis::Cumulative);
        assert_eq!(config.flip.method, FlipMethod::LinearInterpolation);
    }

    #[test]
    fn test_invalid_config() {
        assert!(EngineConfig::from_toml_str("contract_multiplier = -1.0").is_err());
        assert!(EngineConfig::from_toml_str("[curve]\nstaleness_window_secs = -5").is_err());
        assert!(EngineConfig::from_toml_str("contract_multiplier = \"lots\"").is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let mut config = EngineConfig::flow_weighted();
        config.convention = DealerConvention::Fixed {
            call: Side::Short,
            put: Side::Short,
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }
}
