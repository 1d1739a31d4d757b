//! Exposure curves and Gamma Flip detection
//!
//! Turns a point-in-time view of the dealer book into strike-axis curves and
//! locates where aggregate dealer gamma changes sign.
//!
//! Pipeline:
//! 1. **Curve building**: sum dealer-attributed gamma/vanna/charm per strike,
//!    after expiry filtering and staleness exclusion
//! 2. **Flip detection**: one pass over the ordered curve recording every sign
//!    change, interpolated, with nearest-to-spot tie-break and an ambiguity flag
//! 3. **Publishing**: the engine appends the version-tagged result to the series store

mod config;
mod curve;
mod engine;
mod flip;

pub use config::*;
pub use curve::*;
pub use engine::*;
pub use flip::*;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::book::BookVersion;

/// How a crossing is converted into a flip strike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipMethod {
    /// Linear interpolation between the two bracketing strikes
    LinearInterpolation,
    /// The bracketing strike whose net gamma is closer to zero
    NearestStrike,
}

impl FlipMethod {
    pub fn label(&self) -> &'static str {
        match self {
            FlipMethod::LinearInterpolation => "linear-interpolation",
            FlipMethod::NearestStrike => "nearest-strike",
        }
    }
}

/// Series scanned for sign changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipBasis {
    /// Net gamma at each strike
    PerStrike,
    /// Running sum of net gamma over ascending strikes
    Cumulative,
}

/// Dealer gamma regime at the current spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GammaRegime {
    /// Spot above the flip: dealer hedging dampens moves
    LongGamma,
    /// Spot at or below the flip: dealer hedging amplifies moves
    ShortGamma,
    /// No flip found
    Undetermined,
}

impl GammaRegime {
    pub fn label(&self) -> &'static str {
        match self {
            GammaRegime::LongGamma => "Long Gamma",
            GammaRegime::ShortGamma => "Short Gamma",
            GammaRegime::Undetermined => "Undetermined",
        }
    }
}

/// Aggregated dealer exposure at one strike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureCurvePoint {
    pub strike: f64,
    /// Dealer gamma (shares of underlying per unit spot move)
    pub net_gamma: f64,
    pub net_vanna: f64,
    pub net_charm: f64,
    /// Dealer dollar gamma per 1% move
    pub net_gex: f64,
    /// Sum of absolute underlying notionals, for display
    pub notional: f64,
    pub contributing_count: usize,
}

/// Strike-ordered exposure curve derived from one book version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureCurve {
    pub version: BookVersion,
    pub as_of: DateTime<Utc>,
    pub expiry_filter: ExpiryFilter,
    /// Expiries admitted by the filter
    pub expiries: Vec<NaiveDate>,
    /// Points ordered by ascending strike
    pub points: Vec<ExposureCurvePoint>,
    /// Entries skipped for being older than the staleness window
    pub stale_excluded: usize,
}

impl ExposureCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn strikes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.strike).collect()
    }

    pub fn point_at(&self, strike: f64) -> Option<&ExposureCurvePoint> {
        self.points.iter().find(|p| (p.strike - strike).abs() < 1e-9)
    }

    pub fn total_gamma(&self) -> f64 {
        self.points.iter().map(|p| p.net_gamma).sum()
    }

    pub fn total_gex(&self) -> f64 {
        self.points.iter().map(|p| p.net_gex).sum()
    }

    pub fn total_vanna(&self) -> f64 {
        self.points.iter().map(|p| p.net_vanna).sum()
    }

    pub fn total_charm(&self) -> f64 {
        self.points.iter().map(|p| p.net_charm).sum()
    }

    /// Running sum of net gamma over ascending strikes
    pub fn cumulative_gamma(&self) -> Vec<f64> {
        self.points
            .iter()
            .scan(0.0, |acc, p| {
                *acc += p.net_gamma;
                Some(*acc)
            })
            .collect()
    }
}

/// Curve for a single expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirySlice {
    pub expiry: NaiveDate,
    pub curve: ExposureCurve,
}

/// Output of flip detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaFlipResult {
    /// Book version of the curve that was scanned
    pub version: BookVersion,
    /// Crossing nearest to spot; None when no crossing exists
    pub flip_strike: Option<f64>,
    pub underlying_price: f64,
    pub crossing_count: usize,
    /// Every crossing found, ascending
    pub crossings: Vec<f64>,
    pub method: FlipMethod,
    pub basis: FlipBasis,
    /// More than one crossing: treat as lower confidence
    pub ambiguous: bool,
}

impl GammaFlipResult {
    pub fn regime(&self) -> GammaRegime {
        match self.flip_strike {
            Some(flip) if self.underlying_price > flip => GammaRegime::LongGamma,
            Some(_) => GammaRegime::ShortGamma,
            None => GammaRegime::Undetermined,
        }
    }

    /// Signed distance from spot to the flip (positive = flip above spot)
    pub fn distance_from_spot(&self) -> Option<f64> {
        self.flip_strike.map(|k| k - self.underlying_price)
    }

    pub fn summary(&self) -> String {
        match self.flip_strike {
            Some(k) => format!(
                "flip {:.2} ({}, {} crossing{}{}) | spot {:.2} | {}",
                k,
                self.method.label(),
                self.crossing_count,
                if self.crossing_count == 1 { "" } else { "s" },
                if self.ambiguous { ", ambiguous" } else { "" },
                self.underlying_price,
                self.regime().label()
            ),
            None => format!("no flip | spot {:.2}", self.underlying_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(strike: f64, net_gamma: f64) -> ExposureCurvePoint {
        ExposureCurvePoint {
            strike,
            net_gamma,
            net_vanna: 0.0,
            net_charm: 0.0,
            net_gex: net_gamma * 10.0,
            notional: 0.0,
            contributing_count: 1,
        }
    }

    #[test]
    fn test_curve_totals() {
        let curve = ExposureCurve {
            version: BookVersion(3),
            as_of: Utc::now(),
            expiry_filter: ExpiryFilter::All,
            expiries: Vec::new(),
            points: vec![point(4000.0, -100.0), point(4050.0, -50.0), point(4100.0, 60.0)],
            stale_excluded: 0,
        };

        assert_eq!(curve.total_gamma(), -90.0);
        assert_eq!(curve.total_gex(), -900.0);
        assert_eq!(curve.cumulative_gamma(), vec![-100.0, -150.0, -90.0]);
        assert!(curve.point_at(4050.0).is_some());
        assert!(curve.point_at(4075.0).is_none());
    }

    #[test]
    fn test_regime() {
        let mut result = GammaFlipResult {
            version: BookVersion(1),
            flip_strike: Some(4120.0),
            underlying_price: 4100.0,
            crossing_count: 1,
            crossings: vec![4120.0],
            method: FlipMethod::LinearInterpolation,
            basis: FlipBasis::PerStrike,
            ambiguous: false,
        };
        assert_eq!(result.regime(), GammaRegime::ShortGamma);
        assert_eq!(result.distance_from_spot(), Some(20.0));

        result.underlying_price = 4150.0;
        assert_eq!(result.regime(), GammaRegime::LongGamma);

        result.flip_strike = None;
        assert_eq!(result.regime(), GammaRegime::Undetermined);
        assert!(result.summary().starts_with("no flip"));
    }
}
