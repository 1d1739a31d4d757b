//! Synthetic option chain
//!
//! Seeded mock chain for offline runs and tests: 20 strikes around 4000-4190,
//! three expiries (+7, +30, +60 days), flat 15% vol, random open interest and
//! random open/close customer flow.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

use super::{ChainSnapshot, ChainSource};
use crate::core::{ContractSnapshot, CustomerFlow, ExposureError, ExposureResult, OptionType};

#[derive(Debug, Clone)]
pub struct SyntheticChainConfig {
    pub spot: f64,
    pub first_strike: i64,
    pub strike_step: i64,
    pub strike_count: usize,
    pub expiry_days: Vec<i64>,
    pub implied_vol: f64,
    pub risk_free_rate: f64,
    /// Per-fetch relative spot move is drawn from ±`spot_jitter`
    pub spot_jitter: f64,
}

impl Default for SyntheticChainConfig {
    fn default() -> Self {
        Self {
            spot: 4100.0,
            first_strike: 4000,
            strike_step: 10,
            strike_count: 20,
            expiry_days: vec![7, 30, 60],
            implied_vol: 0.15,
            risk_free_rate: 0.04,
            spot_jitter: 0.0,
        }
    }
}

pub struct SyntheticChainSource {
    config: SyntheticChainConfig,
    rng: ChaCha8Rng,
    spot: f64,
}

impl SyntheticChainSource {
    pub fn new(seed: u64) -> Self {
        Self::with_config(SyntheticChainConfig::default(), seed)
    }

    pub fn with_config(config: SyntheticChainConfig, seed: u64) -> Self {
        let spot = config.spot;
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            spot,
        }
    }

    fn contract(&mut self, strike: Decimal, days: i64, option_type: OptionType, as_of: DateTime<Utc>) -> ContractSnapshot {
        let open_interest = self.rng.gen_range(100..1000);
        let flow = CustomerFlow::new(self.rng.gen_range(0..100), self.rng.gen_range(0..100));
        let mut contract = ContractSnapshot::new(
            strike,
            (as_of + Duration::days(days)).date_naive(),
            option_type,
            open_interest,
            self.config.implied_vol,
            self.spot,
            self.config.risk_free_rate,
            as_of,
        )
        .with_customer_flow(flow);
        contract.volume = flow.buy_to_open + flow.sell_to_open;
        contract
    }
}

impl ChainSource for SyntheticChainSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&mut self, as_of: DateTime<Utc>) -> ExposureResult<ChainSnapshot> {
        if !(self.spot > 0.0) || self.config.strike_step <= 0 {
            return Err(ExposureError::invalid_input(format!(
                "synthetic chain needs a positive spot and strike step (spot {}, step {})",
                self.spot, self.config.strike_step
            )));
        }

        if self.config.spot_jitter > 0.0 {
            let jitter = self.config.spot_jitter;
            self.spot *= 1.0 + self.rng.gen_range(-jitter..jitter);
        }

        let expiry_days = self.config.expiry_days.clone();
        let mut contracts =
            Vec::with_capacity(expiry_days.len() * self.config.strike_count * 2);
        for days in expiry_days {
            for i in 0..self.config.strike_count {
                let strike =
                    Decimal::from(self.config.first_strike + self.config.strike_step * i as i64);
                contracts.push(self.contract(strike, days, OptionType::Call, as_of));
                contracts.push(self.contract(strike, days, OptionType::Put, as_of));
            }
        }

        tracing::debug!(
            "Synthetic chain: {} contracts, spot {:.2}",
            contracts.len(),
            self.spot
        );

        Ok(ChainSnapshot {
            as_of,
            underlying_price: self.spot,
            contracts,
            malformed: Vec::new(),
        })
    }
}
