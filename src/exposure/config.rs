//! Configuration for curve building and flip detection

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{FlipBasis, FlipMethod};

/// Which expiries contribute to a curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpiryFilter {
    /// Every expiry in the book
    All,
    /// Only the first expiry on or after the as-of date
    NearestExpiry,
    /// Expiries from the as-of date up to `days` calendar days out
    ExpiriesWithin { days: u32 },
    /// The first `count` expiries on or after the as-of date
    NearestN { count: usize },
    /// A single expiry date
    Single { expiry: NaiveDate },
}

impl ExpiryFilter {
    /// Select the admitted expiries out of the (sorted, deduplicated) expiries present
    pub fn select(&self, expiries: &[NaiveDate], as_of: NaiveDate) -> Vec<NaiveDate> {
        let upcoming = expiries.iter().copied().filter(|e| *e >= as_of);
        match *self {
            ExpiryFilter::All => expiries.to_vec(),
            ExpiryFilter::NearestExpiry => upcoming.take(1).collect(),
            ExpiryFilter::ExpiriesWithin { days } => {
                let horizon = as_of + Duration::days(i64::from(days));
                upcoming.filter(|e| *e <= horizon).collect()
            }
            ExpiryFilter::NearestN { count } => upcoming.take(count).collect(),
            ExpiryFilter::Single { expiry } => expiries
                .iter()
                .copied()
                .filter(|e| *e == expiry)
                .collect(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            ExpiryFilter::All => "all".to_string(),
            ExpiryFilter::NearestExpiry => "nearest".to_string(),
            ExpiryFilter::ExpiriesWithin { days } => format!("within {}d", days),
            ExpiryFilter::NearestN { count } => format!("nearest {}", count),
            ExpiryFilter::Single { expiry } => expiry.to_string(),
        }
    }
}

impl Default for ExpiryFilter {
    fn default() -> Self {
        ExpiryFilter::All
    }
}

/// How strikes are grouped into curve points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrikeBucketing {
    /// One point per distinct strike
    Exact,
    /// Strikes rounded to the nearest multiple of `width`
    Width { width: Decimal },
}

impl StrikeBucketing {
    /// Bucket a strike; midpoints round away from zero
    pub fn bucket(&self, strike: Decimal) -> Decimal {
        match *self {
            StrikeBucketing::Exact => strike,
            StrikeBucketing::Width { width } if width > Decimal::ZERO => {
                let steps = (strike / width).round_dp_with_strategy(
                    0,
                    rust_decimal::RoundingStrategy::MidpointAwayFromZero,
                );
                (steps * width).normalize()
            }
            StrikeBucketing::Width { .. } => strike,
        }
    }
}

impl Default for StrikeBucketing {
    fn default() -> Self {
        StrikeBucketing::Exact
    }
}

/// Curve building configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Entries whose source timestamp is older than this many seconds
    /// (relative to the curve's as-of instant) are left out.
    /// Default: None (never stale)
    pub staleness_window_secs: Option<i64>,

    /// Default expiry filter for the engine's recompute cycle
    pub expiry_filter: ExpiryFilter,

    /// Default strike bucketing for the engine's recompute cycle
    pub bucketing: StrikeBucketing,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            staleness_window_secs: None,
            expiry_filter: ExpiryFilter::All,
            bucketing: StrikeBucketing::Exact,
        }
    }
}

impl CurveConfig {
    pub fn staleness_window(&self) -> Option<Duration> {
        self.staleness_window_secs.map(Duration::seconds)
    }
}

/// Gamma flip detection configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipConfig {
    /// How each crossing is turned into a strike
    /// Default: linear interpolation
    pub method: FlipMethod,

    /// Which series is scanned for sign changes
    /// Default: per-strike net gamma
    pub basis: FlipBasis,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            method: FlipMethod::LinearInterpolation,
            basis: FlipBasis::PerStrike,
        }
    }
}
