//! Gamma Flip detection
//!
//! Single pass over an ordered curve recording every sign change of net
//! dealer gamma. Between adjacent strikes K1 < K2 with gamma g1, g2 of
//! opposite sign the crossing is linearly interpolated:
//!
//! K* = K1 - g1 · (K2 - K1) / (g2 - g1)
//!
//! A point with gamma exactly zero is itself a crossing at its strike. When
//! several crossings exist the one nearest spot is reported and the result
//! is flagged ambiguous.

use super::{ExposureCurve, FlipBasis, FlipConfig, FlipMethod, GammaFlipResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct GammaFlipDetector {
    config: FlipConfig,
}

impl GammaFlipDetector {
    pub fn new(config: FlipConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlipConfig {
        &self.config
    }

    /// Locate the gamma flip on `curve` relative to `underlying_price`
    pub fn detect_flip(&self, curve: &ExposureCurve, underlying_price: f64) -> GammaFlipResult {
        let strikes = curve.strikes();
        let series = match self.config.basis {
            FlipBasis::PerStrike => curve.points.iter().map(|p| p.net_gamma).collect(),
            FlipBasis::Cumulative => curve.cumulative_gamma(),
        };

        let crossings = find_crossings(&strikes, &series, self.config.method);
        let flip_strike = nearest_to(&crossings, underlying_price);
        let ambiguous = crossings.len() > 1;

        if ambiguous {
            tracing::warn!(
                "Curve {} has {} gamma sign changes; reporting {:?} nearest spot {:.2}",
                curve.version,
                crossings.len(),
                flip_strike,
                underlying_price
            );
        }

        GammaFlipResult {
            version: curve.version,
            flip_strike,
            underlying_price,
            crossing_count: crossings.len(),
            crossings,
            method: self.config.method,
            basis: self.config.basis,
            ambiguous,
        }
    }
}

/// Every sign change of `values` over ascending `strikes`, in strike order
///
/// Fewer than two points never produce a crossing.
pub fn find_crossings(strikes: &[f64], values: &[f64], method: FlipMethod) -> Vec<f64> {
    let n = strikes.len().min(values.len());
    if n < 2 {
        return Vec::new();
    }

    let mut crossings = Vec::new();
    for i in 0..n {
        let (k1, g1) = (strikes[i], values[i]);
        if g1 == 0.0 {
            crossings.push(k1);
        }
        if i + 1 < n {
            let (k2, g2) = (strikes[i + 1], values[i + 1]);
            if opposite_signs(g1, g2) {
                crossings.push(match method {
                    FlipMethod::LinearInterpolation => interpolate_zero(k1, g1, k2, g2),
                    FlipMethod::NearestStrike => {
                        if g2.abs() < g1.abs() {
                            k2
                        } else {
                            k1
                        }
                    }
                });
            }
        }
    }
    crossings
}

/// Strictly opposite, nonzero signs. Compares signs directly; the product of
/// two tiny values underflows to zero.
fn opposite_signs(a: f64, b: f64) -> bool {
    a != 0.0 && b != 0.0 && (a < 0.0) != (b < 0.0)
}

/// Zero of the line through (k1, g1) and (k2, g2)
pub fn interpolate_zero(k1: f64, g1: f64, k2: f64, g2: f64) -> f64 {
    k1 - g1 * (k2 - k1) / (g2 - g1)
}

/// Candidate closest to `spot`; ties go to the lower strike
fn nearest_to(sorted: &[f64], spot: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for &c in sorted {
        match best {
            Some(b) if (c - spot).abs() >= (b - spot).abs() => {}
            _ => best = Some(c),
        }
    }
    best
}
