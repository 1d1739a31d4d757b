//! Curve building
//!
//! Aggregates a book view into per-strike dealer exposure.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::{CurveConfig, ExpiryFilter, ExpirySlice, ExposureCurve, ExposureCurvePoint, StrikeBucketing};
use crate::book::{BookEntry, BookState, BookView};
use crate::core::{ExposureError, ExposureResult};

#[derive(Debug, Default)]
struct StrikeAccumulator {
    gamma: f64,
    vanna: f64,
    charm: f64,
    gex: f64,
    notional: f64,
    count: usize,
}

impl StrikeAccumulator {
    fn add(&mut self, entry: &BookEntry) {
        let e = &entry.exposure;
        self.gamma += e.greeks.gamma;
        self.vanna += e.greeks.vanna;
        self.charm += e.greeks.charm;
        self.gex += e.gex;
        self.notional += e.notional;
        self.count += 1;
    }
}

/// Stateless transform from a book view to exposure curves
#[derive(Debug, Clone, Copy, Default)]
pub struct ExposureCurveBuilder {
    staleness_window: Option<Duration>,
}

impl ExposureCurveBuilder {
    pub fn new(staleness_window: Option<Duration>) -> Self {
        Self { staleness_window }
    }

    pub fn from_config(config: &CurveConfig) -> Self {
        Self::new(config.staleness_window())
    }

    pub fn staleness_window(&self) -> Option<Duration> {
        self.staleness_window
    }

    /// Build the net exposure curve, ordered by ascending strike.
    ///
    /// Stale entries (relative to `as_of`) and entries that contribute
    /// nothing (expired, or zero open interest) are skipped; strikes left
    /// without contributors are omitted rather than emitted as zero.
    pub fn build_curve(
        &self,
        view: &BookView,
        filter: &ExpiryFilter,
        bucketing: &StrikeBucketing,
        as_of: DateTime<Utc>,
    ) -> ExposureResult<ExposureCurve> {
        if view.state() == BookState::Empty {
            return Err(ExposureError::EmptyBook);
        }

        let (live, stale_excluded) = self.live_entries(view, as_of);
        let expiries = filter.select(&distinct_expiries(&live), as_of.date_naive());

        let points = aggregate(
            live.iter()
                .copied()
                .filter(|e| expiries.binary_search(&e.key().expiry).is_ok()),
            bucketing,
        );

        tracing::debug!(
            "Built curve {} ({}): {} points over {} expiries, {} stale excluded",
            view.version(),
            filter.label(),
            points.len(),
            expiries.len(),
            stale_excluded
        );

        Ok(ExposureCurve {
            version: view.version(),
            as_of,
            expiry_filter: *filter,
            expiries,
            points,
            stale_excluded,
        })
    }

    /// One curve per expiry with live entries, ascending by expiry
    pub fn build_expiry_slices(
        &self,
        view: &BookView,
        bucketing: &StrikeBucketing,
        as_of: DateTime<Utc>,
    ) -> ExposureResult<Vec<ExpirySlice>> {
        if view.state() == BookState::Empty {
            return Err(ExposureError::EmptyBook);
        }

        let (live, _) = self.live_entries(view, as_of);
        distinct_expiries(&live)
            .into_iter()
            .map(|expiry| {
                let curve =
                    self.build_curve(view, &ExpiryFilter::Single { expiry }, bucketing, as_of)?;
                Ok(ExpirySlice { expiry, curve })
            })
            .collect()
    }

    fn live_entries<'a>(
        &self,
        view: &'a BookView,
        as_of: DateTime<Utc>,
    ) -> (Vec<&'a BookEntry>, usize) {
        let mut stale = 0;
        let live = view
            .entries()
            .filter(|e| {
                if e.is_stale(as_of, self.staleness_window) {
                    stale += 1;
                    false
                } else {
                    !e.exposure.greeks.is_zero()
                }
            })
            .collect();
        (live, stale)
    }
}

fn distinct_expiries(entries: &[&BookEntry]) -> Vec<NaiveDate> {
    let mut expiries: Vec<NaiveDate> = entries.iter().map(|e| e.key().expiry).collect();
    expiries.sort();
    expiries.dedup();
    expiries
}

fn aggregate<'a>(
    entries: impl Iterator<Item = &'a BookEntry>,
    bucketing: &StrikeBucketing,
) -> Vec<ExposureCurvePoint> {
    let mut by_strike: BTreeMap<Decimal, StrikeAccumulator> = BTreeMap::new();
    for entry in entries {
        by_strike
            .entry(bucketing.bucket(entry.key().strike))
            .or_default()
            .add(entry);
    }

    by_strike
        .into_iter()
        .map(|(strike, acc)| ExposureCurvePoint {
            strike: strike.to_f64().unwrap_or(f64::NAN),
            net_gamma: acc.gamma,
            net_vanna: acc.vanna,
            net_charm: acc.charm,
            net_gex: acc.gex,
            notional: acc.notional,
            contributing_count: acc.count,
        })
        .collect()
}

impl ExposureCurve {
    /// Most frequent gap between adjacent strikes, smaller gap on ties.
    ///
    /// Gaps are taken in decimal so listed increments compare exactly.
    /// `None` with fewer than two strikes.
    pub fn typical_strike_step(&self) -> Option<f64> {
        let strikes: Vec<Decimal> = self
            .points
            .iter()
            .filter_map(|p| Decimal::from_f64(p.strike))
            .collect();

        let mut gaps: BTreeMap<Decimal, usize> = BTreeMap::new();
        for pair in strikes.windows(2) {
            let gap = (pair[1] - pair[0]).abs().normalize();
            if !gap.is_zero() {
                *gaps.entry(gap).or_default() += 1;
            }
        }

        let mut best: Option<(Decimal, usize)> = None;
        for (gap, count) in gaps {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((gap, count));
            }
        }
        best.and_then(|(gap, _)| gap.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{BookVersion, DealerBook};
    use crate::core::{ContractSnapshot, EngineConfig, OptionType};
    use crate::models::DealerConvention;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 17, 15, 0, 0).unwrap()
    }

    fn contract(
        strike: Decimal,
        expiry: (u32, u32),
        option_type: OptionType,
        age_minutes: i64,
    ) -> ContractSnapshot {
        ContractSnapshot::new(
            strike,
            NaiveDate::from_ymd_opt(2025, expiry.0, expiry.1).unwrap(),
            option_type,
            500,
            0.18,
            4100.0,
            0.04,
            as_of() - Duration::minutes(age_minutes),
        )
    }

    fn ready_book(contracts: &[ContractSnapshot]) -> DealerBook {
        let mut book = DealerBook::from_config(&EngineConfig::default());
        book.replace_snapshot(contracts);
        book
    }

    #[test]
    fn test_empty_book_is_an_error() {
        let book = DealerBook::from_config(&EngineConfig::default());
        let result = ExposureCurveBuilder::default().build_curve(
            &book.snapshot_view(),
            &ExpiryFilter::All,
            &StrikeBucketing::Exact,
            as_of(),
        );
        assert!(matches!(result, Err(ExposureError::EmptyBook)));
    }

    #[test]
    fn test_sums_per_strike_in_order() {
        let contracts = vec![
            contract(dec!(4100), (3, 21), OptionType::Call, 0),
            contract(dec!(4000), (3, 21), OptionType::Put, 0),
            contract(dec!(4100), (3, 21), OptionType::Put, 0),
            contract(dec!(4100), (3, 28), OptionType::Call, 0),
        ];
        let book = ready_book(&contracts);
        let view = book.snapshot_view();
        let curve = ExposureCurveBuilder::default()
            .build_curve(&view, &ExpiryFilter::All, &StrikeBucketing::Exact, as_of())
            .unwrap();

        assert_eq!(curve.strikes(), vec![4000.0, 4100.0]);
        assert_eq!(curve.version, view.version());

        let at_4100 = curve.point_at(4100.0).unwrap();
        assert_eq!(at_4100.contributing_count, 3);

        let expected: f64 = view
            .entries()
            .filter(|e| e.key().strike == dec!(4100))
            .map(|e| e.exposure.greeks.gamma)
            .sum();
        assert!((at_4100.net_gamma - expected).abs() < 1e-9);
        assert!(at_4100.notional > 0.0);
    }

    #[test]
    fn test_expiry_filter_and_omitted_strikes() {
        let contracts = vec![
            contract(dec!(4000), (3, 21), OptionType::Call, 0),
            contract(dec!(4200), (4, 17), OptionType::Call, 0),
        ];
        let book = ready_book(&contracts);
        let curve = ExposureCurveBuilder::default()
            .build_curve(
                &book.snapshot_view(),
                &ExpiryFilter::NearestExpiry,
                &StrikeBucketing::Exact,
                as_of(),
            )
            .unwrap();

        // 4200 only trades in April and is omitted, not zero-filled
        assert_eq!(curve.strikes(), vec![4000.0]);
        assert_eq!(curve.expiries, vec![NaiveDate::from_ymd_opt(2025, 3, 21).unwrap()]);
    }

    #[test]
    fn test_stale_entries_are_excluded_not_deleted() {
        let contracts = vec![
            contract(dec!(4000), (3, 21), OptionType::Call, 60),
            contract(dec!(4100), (3, 21), OptionType::Call, 1),
        ];
        let book = ready_book(&contracts);
        let builder = ExposureCurveBuilder::new(Some(Duration::minutes(15)));

        let curve = builder
            .build_curve(&book.snapshot_view(), &ExpiryFilter::All, &StrikeBucketing::Exact, as_of())
            .unwrap();

        assert_eq!(curve.strikes(), vec![4100.0]);
        assert_eq!(curve.stale_excluded, 1);
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_expired_contract_is_neutral() {
        let live = vec![contract(dec!(4100), (3, 21), OptionType::Call, 0)];
        let mut with_expired = live.clone();
        with_expired.push(contract(dec!(4000), (3, 14), OptionType::Put, 0));

        let builder = ExposureCurveBuilder::default();
        let a = builder
            .build_curve(&ready_book(&live).snapshot_view(), &ExpiryFilter::All, &StrikeBucketing::Exact, as_of())
            .unwrap();
        let b = builder
            .build_curve(&ready_book(&with_expired).snapshot_view(), &ExpiryFilter::All, &StrikeBucketing::Exact, as_of())
            .unwrap();

        assert_eq!(a.points, b.points);
    }

    #[test]
    fn test_bucketing_merges_strikes() {
        let contracts = vec![
            contract(dec!(4090), (3, 21), OptionType::Call, 0),
            contract(dec!(4105), (3, 21), OptionType::Call, 0),
            contract(dec!(4140), (3, 21), OptionType::Call, 0),
        ];
        let book = ready_book(&contracts);
        let curve = ExposureCurveBuilder::default()
            .build_curve(
                &book.snapshot_view(),
                &ExpiryFilter::All,
                &StrikeBucketing::Width { width: dec!(50) },
                as_of(),
            )
            .unwrap();

        assert_eq!(curve.strikes(), vec![4100.0, 4150.0]);
        assert_eq!(curve.points[0].contributing_count, 2);
    }

    #[test]
    fn test_expiry_slices() {
        let contracts = vec![
            contract(dec!(4000), (3, 21), OptionType::Call, 0),
            contract(dec!(4000), (3, 28), OptionType::Put, 0),
            contract(dec!(4100), (3, 28), OptionType::Call, 0),
        ];
        let book = ready_book(&contracts);
        let slices = ExposureCurveBuilder::default()
            .build_expiry_slices(&book.snapshot_view(), &StrikeBucketing::Exact, as_of())
            .unwrap();

        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].curve.len(), 1);
        assert_eq!(slices[1].curve.strikes(), vec![4000.0, 4100.0]);
    }

    #[test]
    fn test_flipping_put_sign_negates_put_contribution() {
        let contracts = vec![
            contract(dec!(4000), (3, 21), OptionType::Call, 0),
            contract(dec!(4000), (3, 21), OptionType::Put, 0),
        ];
        let base = DealerConvention::short_calls_long_puts();
        let mut config = EngineConfig::default();

        let gamma_of = |convention: DealerConvention, config: &mut EngineConfig| {
            config.convention = convention;
            let mut book = DealerBook::from_config(config);
            book.replace_snapshot(&contracts);
            let view = book.snapshot_view();
            let by_type = |t: OptionType| -> f64 {
                view.entries()
                    .filter(|e| e.key().option_type == t)
                    .map(|e| e.exposure.greeks.gamma)
                    .sum()
            };
            (by_type(OptionType::Call), by_type(OptionType::Put))
        };

        let (call_a, put_a) = gamma_of(base, &mut config);
        let (call_b, put_b) = gamma_of(base.with_flipped(OptionType::Put), &mut config);

        assert_eq!(call_a, call_b);
        assert_eq!(put_a, -put_b);
    }

    #[test]
    fn test_typical_strike_step() {
        let curve_at = |strikes: &[f64]| ExposureCurve {
            version: BookVersion(1),
            as_of: as_of(),
            expiry_filter: ExpiryFilter::All,
            expiries: Vec::new(),
            points: strikes
                .iter()
                .map(|&strike| ExposureCurvePoint {
                    strike,
                    net_gamma: 1.0,
                    net_vanna: 0.0,
                    net_charm: 0.0,
                    net_gex: 0.0,
                    notional: 0.0,
                    contributing_count: 1,
                })
                .collect(),
            stale_excluded: 0,
        };

        // Dense 5-wide strikes near the money, 25-wide in the wings
        let mixed = curve_at(&[3950.0, 3975.0, 4000.0, 4005.0, 4010.0, 4015.0, 4020.0, 4045.0]);
        assert_eq!(mixed.typical_strike_step(), Some(5.0));

        // Equal counts: the finer increment wins
        assert_eq!(curve_at(&[100.0, 102.5, 105.0, 115.0, 125.0]).typical_strike_step(), Some(2.5));

        assert_eq!(curve_at(&[4100.0]).typical_strike_step(), None);
        assert_eq!(curve_at(&[]).typical_strike_step(), None);
    }
}
