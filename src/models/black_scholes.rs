//! Black-Scholes Model
//!
//! Provides:
//! - European option pricing
//! - Closed-form Greeks, including the cross second-order terms (vanna, charm)
//! - `GreekCalculator`: Greeks for a `ContractSnapshot` under a day-count convention
//!
//! Vanna and charm come from the closed forms of the generalized
//! Black-Scholes model with a continuous dividend yield; nothing here is
//! finite-differenced, so identical inputs give bit-identical outputs.

use std::f64::consts::{PI, SQRT_2};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use crate::core::{ContractSnapshot, EngineConfig, ExposureError, ExposureResult, GreekSet, OptionType};

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes d1 parameter
pub fn d1(spot: f64, strike: f64, rate: f64, div: f64, vol: f64, time: f64) -> f64 {
    ((spot / strike).ln() + (rate - div + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

/// Black-Scholes d2 parameter
pub fn d2(spot: f64, strike: f64, rate: f64, div: f64, vol: f64, time: f64) -> f64 {
    d1(spot, strike, rate, div, vol, time) - vol * time.sqrt()
}

/// Black-Scholes European option price
pub fn price(
    spot: f64,
    strike: f64,
    rate: f64,
    div: f64,
    vol: f64,
    time: f64,
    option_type: OptionType,
) -> f64 {
    if time <= 0.0 {
        return option_type.intrinsic(spot, strike);
    }

    let d1 = d1(spot, strike, rate, div, vol, time);
    let d2 = d2(spot, strike, rate, div, vol, time);
    let df = (-rate * time).exp();
    let div_factor = (-div * time).exp();

    match option_type {
        OptionType::Call => spot * div_factor * norm_cdf(d1) - strike * df * norm_cdf(d2),
        OptionType::Put => strike * df * norm_cdf(-d2) - spot * div_factor * norm_cdf(-d1),
    }
}

/// Black-Scholes Greeks
///
/// `time` is in years; theta and charm are rescaled to per-day figures
/// using `days_per_year`. Non-positive time or vol yields all zeros.
#[allow(clippy::too_many_arguments)]
pub fn greeks(
    spot: f64,
    strike: f64,
    rate: f64,
    div: f64,
    vol: f64,
    time: f64,
    option_type: OptionType,
    days_per_year: f64,
) -> GreekSet {
    if time <= 0.0 || vol <= 0.0 {
        return GreekSet::ZERO;
    }

    let d1 = d1(spot, strike, rate, div, vol, time);
    let d2 = d2(spot, strike, rate, div, vol, time);
    let df = (-rate * time).exp();
    let sqrt_t = time.sqrt();
    let pdf_d1 = norm_pdf(d1);
    let div_factor = (-div * time).exp();

    let delta = match option_type {
        OptionType::Call => div_factor * norm_cdf(d1),
        OptionType::Put => div_factor * (norm_cdf(d1) - 1.0),
    };

    // Gamma (same for call and put)
    let gamma = div_factor * pdf_d1 / (spot * vol * sqrt_t);

    // Vega per 1% vol move
    let vega = spot * div_factor * pdf_d1 * sqrt_t / 100.0;

    let term1 = -spot * div_factor * pdf_d1 * vol / (2.0 * sqrt_t);
    let theta = match option_type {
        OptionType::Call => {
            term1 - rate * strike * df * norm_cdf(d2) + div * spot * div_factor * norm_cdf(d1)
        }
        OptionType::Put => {
            term1 + rate * strike * df * norm_cdf(-d2) - div * spot * div_factor * norm_cdf(-d1)
        }
    };

    // Vanna: d(delta)/d(vol) = d(vega)/d(spot)
    let vanna = -div_factor * pdf_d1 * d2 / vol;

    // Charm: d(delta)/dt with t calendar time, i.e. -d(delta)/d(tau)
    let drift = div_factor * pdf_d1 * (2.0 * (rate - div) * time - d2 * vol * sqrt_t)
        / (2.0 * time * vol * sqrt_t);
    let charm = match option_type {
        OptionType::Call => div * div_factor * norm_cdf(d1) - drift,
        OptionType::Put => -div * div_factor * norm_cdf(-d1) - drift,
    };

    GreekSet {
        delta,
        gamma,
        vanna,
        charm: charm / days_per_year,
        theta: theta / days_per_year,
        vega,
    }
}

/// Day-count convention for year fractions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCount {
    /// Actual / 365 fixed
    Act365Fixed,
    /// Actual / 365.25
    Act365_25,
    /// Actual / 360
    Act360,
}

impl DayCount {
    pub fn days_per_year(&self) -> f64 {
        match self {
            DayCount::Act365Fixed => 365.0,
            DayCount::Act365_25 => 365.25,
            DayCount::Act360 => 360.0,
        }
    }

    /// Year fraction between two instants (negative if `to` precedes `from`)
    pub fn year_fraction(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
        let seconds = (to - from).num_milliseconds() as f64 / 1000.0;
        seconds / (86_400.0 * self.days_per_year())
    }
}

impl Default for DayCount {
    fn default() -> Self {
        DayCount::Act365Fixed
    }
}

/// Pure Greek calculator for contract snapshots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreekCalculator {
    /// Convention for `expiry - timestamp`
    pub day_count: DayCount,
    /// Time of day (UTC) at which a contract expires on its expiry date
    pub expiry_cutoff: NaiveTime,
}

impl GreekCalculator {
    pub fn new(day_count: DayCount, expiry_cutoff: NaiveTime) -> Self {
        Self {
            day_count,
            expiry_cutoff,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.day_count, config.expiry_cutoff)
    }

    pub fn expiry_instant(&self, expiry: NaiveDate) -> DateTime<Utc> {
        expiry.and_time(self.expiry_cutoff).and_utc()
    }

    /// Time to expiry in years, measured from the snapshot timestamp
    pub fn time_to_expiry(&self, contract: &ContractSnapshot) -> f64 {
        self.day_count
            .year_fraction(contract.timestamp, self.expiry_instant(contract.expiry))
    }

    /// Greeks for one contract.
    ///
    /// Expired contracts produce `GreekSet::ZERO`; a non-positive implied
    /// vol is an `InvalidInput` error.
    pub fn compute_greeks(&self, contract: &ContractSnapshot) -> ExposureResult<GreekSet> {
        let (spot, strike) = self.checked_inputs(contract)?;

        let time = self.time_to_expiry(contract);
        if time <= 0.0 {
            return Ok(GreekSet::ZERO);
        }

        Ok(greeks(
            spot,
            strike,
            contract.risk_free_rate,
            contract.dividend_yield,
            contract.implied_vol,
            time,
            contract.option_type,
            self.day_count.days_per_year(),
        ))
    }

    fn checked_inputs(&self, contract: &ContractSnapshot) -> ExposureResult<(f64, f64)> {
        // `!(x > 0)` also catches NaN
        if !(contract.implied_vol > 0.0) || !contract.implied_vol.is_finite() {
            return Err(ExposureError::invalid_input(format!(
                "implied volatility must be positive, got {} for {}",
                contract.implied_vol,
                contract.key()
            )));
        }

        let spot = contract.underlying_price;
        let strike = contract.strike_f64();
        if !(spot > 0.0) || !(strike > 0.0) {
            return Err(ExposureError::invalid_input(format!(
                "spot and strike must be positive, got {} / {}",
                spot, strike
            )));
        }

        Ok((spot, strike))
    }
}

impl Default for GreekCalculator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn contract(option_type: OptionType, days: i64) -> ContractSnapshot {
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 20, 0, 0).unwrap();
        ContractSnapshot::new(
            dec!(100),
            (ts + Duration::days(days)).date_naive(),
            option_type,
            1,
            0.2,
            100.0,
            0.05,
            ts,
        )
    }

    #[test]
    fn test_norm_cdf() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-10);
        assert!((norm_cdf(1.96) - 0.975).abs() < 0.001);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 0.001);

        use statrs::distribution::{ContinuousCDF, Normal};
        let standard = Normal::new(0.0, 1.0).unwrap();
        for x in [-6.0, -2.5, -0.3, 0.0, 0.7, 3.1, 8.0] {
            assert!((norm_cdf(x) - standard.cdf(x)).abs() < 1e-14, "x = {}", x);
        }
    }

    #[test]
    fn test_bs_price() {
        // ATM call, 20% vol, 1 year, 5% rate
        let call_price = price(100.0, 100.0, 0.05, 0.0, 0.20, 1.0, OptionType::Call);
        assert!(call_price > 10.0 && call_price < 11.0);

        // Put-call parity
        let put_price = price(100.0, 100.0, 0.05, 0.0, 0.20, 1.0, OptionType::Put);
        let parity = call_price - put_price - (100.0 - 100.0 * (-0.05_f64).exp());
        assert!(parity.abs() < 1e-9);
    }

    #[test]
    fn test_delta_gamma_match_price_bumps() {
        let (s, k, r, q, v, t) = (100.0, 105.0, 0.04, 0.015, 0.25, 0.4);
        for option_type in [OptionType::Call, OptionType::Put] {
            let g = greeks(s, k, r, q, v, t, option_type, 365.0);

            let h = 1e-2;
            let up = price(s + h, k, r, q, v, t, option_type);
            let mid = price(s, k, r, q, v, t, option_type);
            let down = price(s - h, k, r, q, v, t, option_type);

            assert!((g.delta - (up - down) / (2.0 * h)).abs() < 1e-6);
            assert!((g.gamma - (up - 2.0 * mid + down) / (h * h)).abs() < 1e-5);
        }
        assert_eq!(price(100.0, 90.0, 0.04, 0.0, 0.2, 0.0, OptionType::Call), 10.0);
    }

    #[test]
    fn test_greeks() {
        let g = greeks(100.0, 100.0, 0.05, 0.0, 0.20, 1.0, OptionType::Call, 365.0);

        assert!(g.delta > 0.5 && g.delta < 0.7);
        assert!(g.gamma > 0.0);
        assert!((g.gamma - 0.0188).abs() < 0.001);
        assert!(g.theta < 0.0);
        assert!(g.vega > 0.0);
    }

    #[test]
    fn test_gamma_same_for_call_and_put() {
        let c = greeks(100.0, 95.0, 0.03, 0.01, 0.25, 0.5, OptionType::Call, 365.0);
        let p = greeks(100.0, 95.0, 0.03, 0.01, 0.25, 0.5, OptionType::Put, 365.0);
        assert!((c.gamma - p.gamma).abs() < 1e-15);
        assert!((c.vanna - p.vanna).abs() < 1e-15);
        assert!((c.delta - p.delta - (-0.01_f64 * 0.5).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_vanna_matches_delta_vol_bump() {
        let (s, k, r, q, v, t) = (100.0, 110.0, 0.04, 0.01, 0.22, 0.3);
        let g = greeks(s, k, r, q, v, t, OptionType::Call, 365.0);

        let h = 1e-5;
        let up = greeks(s, k, r, q, v + h, t, OptionType::Call, 365.0).delta;
        let down = greeks(s, k, r, q, v - h, t, OptionType::Call, 365.0).delta;
        let fd = (up - down) / (2.0 * h);

        assert!((g.vanna - fd).abs() < 1e-6, "vanna {} vs fd {}", g.vanna, fd);
    }

    #[test]
    fn test_charm_matches_delta_time_decay() {
        let (s, k, r, q, v, t) = (100.0, 95.0, 0.04, 0.02, 0.3, 0.25);
        for option_type in [OptionType::Call, OptionType::Put] {
            let g = greeks(s, k, r, q, v, t, option_type, 365.0);

            // One calendar day forward is one day less to expiry
            let h = 1e-5;
            let later = greeks(s, k, r, q, v, t - h, option_type, 365.0).delta;
            let earlier = greeks(s, k, r, q, v, t + h, option_type, 365.0).delta;
            let per_year = (later - earlier) / (2.0 * h);

            assert!(
                (g.charm * 365.0 - per_year).abs() < 1e-5,
                "{:?}: charm {} vs fd {}",
                option_type,
                g.charm * 365.0,
                per_year
            );
        }
    }

    #[test]
    fn test_expired_contract_is_zero() {
        let calc = GreekCalculator::default();
        let expired = contract(OptionType::Call, -3);
        assert!(calc.time_to_expiry(&expired) < 0.0);
        assert!(calc.compute_greeks(&expired).unwrap().is_zero());

        let live = contract(OptionType::Call, 30);
        assert!(!calc.compute_greeks(&live).unwrap().is_zero());
    }

    #[test]
    fn test_non_positive_iv_is_rejected() {
        let calc = GreekCalculator::default();
        let mut c = contract(OptionType::Put, 30);
        c.implied_vol = 0.0;
        assert!(matches!(
            calc.compute_greeks(&c),
            Err(ExposureError::InvalidInput(_))
        ));

        c.implied_vol = f64::NAN;
        assert!(calc.compute_greeks(&c).is_err());
    }

    #[test]
    fn test_day_count() {
        let calc = GreekCalculator::new(DayCount::Act360, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        let c = contract(OptionType::Call, 36);
        assert!((calc.time_to_expiry(&c) - 0.1).abs() < 1e-12);

        let calc = GreekCalculator::new(DayCount::Act365Fixed, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert!((calc.time_to_expiry(&c) - 36.0 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let calc = GreekCalculator::default();
        let c = contract(OptionType::Put, 12);
        assert_eq!(calc.compute_greeks(&c).unwrap(), calc.compute_greeks(&c).unwrap());
    }
}
