//! Option contract definitions
//!
//! Contract snapshots as delivered by a chain source, the key they are
//! stored under, and the raw wire record they are parsed from.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            OptionType::Call => "C",
            OptionType::Put => "P",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            _ => Err(ValidationError::UnknownOptionType(s.to_string())),
        }
    }
}

/// Identity of a book entry: (strike, expiry, type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractKey {
    pub strike: Decimal,
    pub expiry: NaiveDate,
    pub option_type: OptionType,
}

impl ContractKey {
    pub fn new(strike: Decimal, expiry: NaiveDate, option_type: OptionType) -> Self {
        Self {
            strike,
            expiry,
            option_type,
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}",
            self.expiry,
            self.strike,
            self.option_type.short_label()
        )
    }
}

/// Customer open/close volume split for one contract (e.g. Cboe Open-Close data)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerFlow {
    pub buy_to_open: i64,
    pub sell_to_open: i64,
}

impl CustomerFlow {
    pub fn new(buy_to_open: i64, sell_to_open: i64) -> Self {
        Self {
            buy_to_open,
            sell_to_open,
        }
    }

    /// Net customer opening purchases (positive = customers net long)
    pub fn net_customer_buying(&self) -> i64 {
        self.buy_to_open - self.sell_to_open
    }
}

/// One option contract as observed at `timestamp`.
///
/// Counts are signed so that a bad record survives parsing and is rejected
/// by [`ContractSnapshot::validate`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    pub strike: Decimal,
    pub expiry: NaiveDate,
    pub option_type: OptionType,
    pub open_interest: i64,
    pub volume: i64,
    pub implied_vol: f64,
    pub underlying_price: f64,
    pub risk_free_rate: f64,
    #[serde(default)]
    pub dividend_yield: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub customer_flow: Option<CustomerFlow>,
}

impl ContractSnapshot {
    /// Snapshot with zero volume, zero dividend yield and no flow data
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        strike: Decimal,
        expiry: NaiveDate,
        option_type: OptionType,
        open_interest: i64,
        implied_vol: f64,
        underlying_price: f64,
        risk_free_rate: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            strike,
            expiry,
            option_type,
            open_interest,
            volume: 0,
            implied_vol,
            underlying_price,
            risk_free_rate,
            dividend_yield: 0.0,
            timestamp,
            customer_flow: None,
        }
    }

    pub fn with_customer_flow(mut self, flow: CustomerFlow) -> Self {
        self.customer_flow = Some(flow);
        self
    }

    pub fn key(&self) -> ContractKey {
        ContractKey::new(self.strike, self.expiry, self.option_type)
    }

    pub fn strike_f64(&self) -> f64 {
        self.strike.to_f64().unwrap_or(f64::NAN)
    }

    /// Check the record against the ingest rules
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.strike <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveStrike {
                strike: self.strike.to_string(),
            });
        }

        let key = self.key();
        for (field, value) in [
            ("implied_vol", self.implied_vol),
            ("underlying_price", self.underlying_price),
            ("risk_free_rate", self.risk_free_rate),
            ("dividend_yield", self.dividend_yield),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { key, field });
            }
        }

        if self.implied_vol <= 0.0 {
            return Err(ValidationError::NonPositiveImpliedVol {
                key,
                value: self.implied_vol,
            });
        }
        if self.open_interest < 0 {
            return Err(ValidationError::NegativeOpenInterest {
                key,
                value: self.open_interest,
            });
        }
        if self.volume < 0 {
            return Err(ValidationError::NegativeVolume {
                key,
                value: self.volume,
            });
        }
        if self.underlying_price <= 0.0 {
            return Err(ValidationError::NonPositiveUnderlying {
                key,
                value: self.underlying_price,
            });
        }

        Ok(())
    }
}

/// Wire form of a contract as emitted by data collaborators (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractRecord {
    pub strike: Decimal,
    pub expiry: String,
    #[serde(alias = "type")]
    pub option_type: String,
    pub open_interest: i64,
    #[serde(default)]
    pub volume: i64,
    #[serde(alias = "iv")]
    pub implied_vol: f64,
    pub underlying_price: f64,
    #[serde(default)]
    pub risk_free_rate: f64,
    #[serde(default)]
    pub dividend_yield: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub buy_to_open: Option<i64>,
    #[serde(default)]
    pub sell_to_open: Option<i64>,
}

impl TryFrom<ContractRecord> for ContractSnapshot {
    type Error = ValidationError;

    fn try_from(record: ContractRecord) -> Result<Self, Self::Error> {
        let expiry = parse_expiry(&record.expiry)?;
        let option_type = record.option_type.parse::<OptionType>()?;
        let customer_flow = match (record.buy_to_open, record.sell_to_open) {
            (Some(buy), Some(sell)) => Some(CustomerFlow::new(buy, sell)),
            _ => None,
        };

        Ok(Self {
            strike: record.strike,
            expiry,
            option_type,
            open_interest: record.open_interest,
            volume: record.volume,
            implied_vol: record.implied_vol,
            underlying_price: record.underlying_price,
            risk_free_rate: record.risk_free_rate,
            dividend_yield: record.dividend_yield,
            timestamp: record.timestamp,
            customer_flow,
        })
    }
}

/// Parse an expiry given as `YYYY-MM-DD`, `YYYYMMDD` or an RFC 3339 instant
pub fn parse_expiry(raw: &str) -> Result<NaiveDate, ValidationError> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
        .map_err(|_| ValidationError::MalformedExpiry(raw.to_string()))
}
