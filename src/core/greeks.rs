//! Option Greeks
//!
//! First and second order sensitivities for a single contract.

use serde::{Deserialize, Serialize};

/// Greeks for one contract on one unit of underlying
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GreekSet {
    /// Delta: dV/dS
    pub delta: f64,
    /// Gamma: d²V/dS²
    pub gamma: f64,
    /// Vanna: d²V/dSdσ (change in delta per 1.00 of vol)
    pub vanna: f64,
    /// Charm: change in delta per calendar day
    pub charm: f64,
    /// Theta: dV/dt per calendar day
    pub theta: f64,
    /// Vega: dV/dσ per 1 vol point
    pub vega: f64,
}

impl GreekSet {
    pub const ZERO: GreekSet = GreekSet {
        delta: 0.0,
        gamma: 0.0,
        vanna: 0.0,
        charm: 0.0,
        theta: 0.0,
        vega: 0.0,
    };

    /// Scale Greeks by a factor (e.g., for open interest and multiplier)
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            vanna: self.vanna * factor,
            charm: self.charm * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
        }
    }

    /// Add two Greeks (for aggregation)
    pub fn add(&self, other: &GreekSet) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            vanna: self.vanna + other.vanna,
            charm: self.charm + other.charm,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_and_add() {
        let g = GreekSet {
            delta: 0.5,
            gamma: 0.01,
            vanna: -0.2,
            charm: 0.003,
            theta: -0.05,
            vega: 0.12,
        };

        let scaled = g.scale(-100.0);
        assert_eq!(scaled.delta, -50.0);
        assert_eq!(scaled.gamma, -1.0);
        assert_eq!(scaled.vanna, 20.0);

        let sum = g.add(&g.scale(-1.0));
        assert!(sum.is_zero());
        assert!(GreekSet::default().is_zero());
    }
}
