//! Dealer book
//!
//! Holds the latest dealer-attributed exposure per contract key, versioned so
//! that every derived curve can be traced to the exact book state it came from.
//!
//! State machine: `Empty -> Partial` (first incremental update) `-> Ready`
//! (first full snapshot replace). `reset` returns to `Empty`.

mod dealer_book;
mod shared;

pub use dealer_book::*;
pub use shared::*;

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{ContractKey, GreekSet};

/// Monotonically increasing tag on every book state and derived result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookVersion(pub u64);

impl BookVersion {
    pub fn next(self) -> Self {
        BookVersion(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BookVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookState {
    /// No entries and no snapshot yet
    Empty,
    /// Incremental updates only, no full snapshot yet
    Partial,
    /// At least one full snapshot replace has happened
    Ready,
}

/// Raw Greeks scaled by open interest, contract multiplier and dealer weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealerAttributedExposure {
    pub key: ContractKey,
    /// Per-contract Greeks before attribution
    pub raw: GreekSet,
    /// Dealer-attributed Greeks (raw × weight)
    pub greeks: GreekSet,
    /// open interest × multiplier × dealer convention weight
    pub weight: f64,
    pub open_interest: i64,
    pub underlying_price: f64,
    /// Dealer dollar gamma per 1% move: gamma × weight × S² × 0.01
    pub gex: f64,
    /// Absolute underlying notional: |weight| × S
    pub notional: f64,
}

/// One live book entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEntry {
    pub exposure: DealerAttributedExposure,
    pub source_timestamp: DateTime<Utc>,
}

impl BookEntry {
    pub fn key(&self) -> ContractKey {
        self.exposure.key
    }

    /// Older than `window` as of `as_of`; no window means never stale
    pub fn is_stale(&self, as_of: DateTime<Utc>, window: Option<Duration>) -> bool {
        match window {
            Some(w) => as_of - self.source_timestamp > w,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionType;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    #[test]
    fn test_version_ordering() {
        let v = BookVersion::default();
        assert_eq!(v.next(), BookVersion(1));
        assert!(v.next().next() > v.next());
        assert_eq!(BookVersion(7).to_string(), "v7");
    }

    #[test]
    fn test_staleness() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 3, 15, 0, 0).unwrap();
        let entry = BookEntry {
            exposure: DealerAttributedExposure {
                key: ContractKey::new(
                    dec!(100),
                    NaiveDate::from_ymd_opt(2025, 3, 21).unwrap(),
                    OptionType::Call,
                ),
                raw: GreekSet::ZERO,
                greeks: GreekSet::ZERO,
                weight: 0.0,
                open_interest: 0,
                underlying_price: 100.0,
                gex: 0.0,
                notional: 0.0,
            },
            source_timestamp: ts,
        };

        let window = Some(Duration::minutes(5));
        assert!(!entry.is_stale(ts + Duration::minutes(5), window));
        assert!(entry.is_stale(ts + Duration::minutes(6), window));
        assert!(!entry.is_stale(ts + Duration::days(30), None));
    }
}
