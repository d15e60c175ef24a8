//! Lag Price Features
//!
//! Derives the two lag features the price model was trained on: the price
//! roughly 90 days and 365 days before a reference date.
//!
//! Series selection:
//! 1. rows for the crop in the requested district
//! 2. otherwise the crop's daily mean across all districts
//! 3. otherwise no data → both lags are 0
//!
//! Within a series, a lag is the last observation dated on or before
//! `as_of - window`. When the series starts after that cutoff the latest
//! observed price is used instead; nothing is extrapolated backwards.

use crate::data::PriceTable;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

pub const SHORT_LAG_DAYS: i64 = 90;
pub const LONG_LAG_DAYS: i64 = 365;

/// Which series the lags were computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LagCoverage {
    /// Rows for the requested district
    Region,
    /// Mean across every district that reports the crop
    CropAverage,
    /// No rows for the crop at all
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceLags {
    pub lag_90d: f64,
    pub lag_365d: f64,
    pub latest: f64,
    pub coverage: LagCoverage,
}

impl PriceLags {
    pub fn no_data() -> Self {
        Self {
            lag_90d: 0.0,
            lag_365d: 0.0,
            latest: 0.0,
            coverage: LagCoverage::NoData,
        }
    }

    pub fn as_pair(&self) -> (f64, f64) {
        (self.lag_90d, self.lag_365d)
    }
}

/// Lag lookups over a loaded price table
pub struct LagFeatureCalculator<'a> {
    table: &'a PriceTable,
}

impl<'a> LagFeatureCalculator<'a> {
    pub fn new(table: &'a PriceTable) -> Self {
        Self { table }
    }

    pub fn lags(&self, crop_id: &str, district_id: &str, as_of: NaiveDate) -> PriceLags {
        let (series, coverage) = self.series(crop_id, district_id);
        let Some(&(_, latest)) = series.last() else {
            return PriceLags::no_data();
        };

        let lag = |days: i64| last_on_or_before(&series, as_of - Duration::days(days)).unwrap_or(latest);

        PriceLags {
            lag_90d: lag(SHORT_LAG_DAYS),
            lag_365d: lag(LONG_LAG_DAYS),
            latest,
            coverage,
        }
    }

    /// Date-sorted (date, price) series for the crop
    fn series(&self, crop_id: &str, district_id: &str) -> (Vec<(NaiveDate, f64)>, LagCoverage) {
        let mut regional: Vec<(NaiveDate, f64)> = self
            .table
            .crop_points(crop_id)
            .filter(|p| p.district_id == district_id)
            .map(|p| (p.date, p.price))
            .collect();

        if !regional.is_empty() {
            // Stable: same-day rows keep table order
            regional.sort_by_key(|&(date, _)| date);
            return (regional, LagCoverage::Region);
        }

        let averaged = self.table.daily_means(crop_id);
        if averaged.is_empty() {
            (averaged, LagCoverage::NoData)
        } else {
            (averaged, LagCoverage::CropAverage)
        }
    }
}

/// Price of the last observation dated on or before `cutoff`
fn last_on_or_before(series: &[(NaiveDate, f64)], cutoff: NaiveDate) -> Option<f64> {
    let end = series.partition_point(|&(date, _)| date <= cutoff);
    end.checked_sub(1).map(|i| series[i].1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::HistoricalPricePoint;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn point(crop: &str, district: &str, date: NaiveDate, price: f64) -> HistoricalPricePoint {
        HistoricalPricePoint::new(crop, district, date, price)
    }

    #[test]
    fn test_no_rows_gives_zero_lags() {
        let table = PriceTable::from_points(vec![point("Rice", "Delhi", d(2024, 1, 1), 10.0)]);
        let lags = LagFeatureCalculator::new(&table).lags("Cotton", "Delhi", d(2024, 6, 1));
        assert_eq!(lags.as_pair(), (0.0, 0.0));
        assert_eq!(lags.coverage, LagCoverage::NoData);

        let empty = PriceTable::default();
        let lags = LagFeatureCalculator::new(&empty).lags("Rice", "Delhi", d(2024, 6, 1));
        assert_eq!(lags.as_pair(), (0.0, 0.0));
    }

    #[test]
    fn test_single_old_point_fills_both_lags() {
        let table = PriceTable::from_points(vec![point("Maize", "Delhi", d(2022, 1, 1), 1850.0)]);
        let lags = LagFeatureCalculator::new(&table).lags("Maize", "Delhi", d(2024, 6, 1));
        assert_eq!(lags.as_pair(), (1850.0, 1850.0));
        assert_eq!(lags.coverage, LagCoverage::Region);
    }

    #[test]
    fn test_windows_pick_last_point_before_cutoff() {
        let as_of = d(2024, 6, 1);
        let table = PriceTable::from_points(vec![
            point("Maize", "Delhi", d(2024, 5, 20), 300.0),
            point("Maize", "Delhi", d(2023, 5, 1), 100.0),
            point("Maize", "Delhi", d(2024, 2, 1), 200.0),
            // 2024-03-03 is exactly 90 days before as_of
            point("Maize", "Delhi", d(2024, 3, 3), 250.0),
            point("Maize", "Mumbai", d(2024, 3, 1), 999.0),
        ]);
        let lags = LagFeatureCalculator::new(&table).lags("Maize", "Delhi", as_of);
        assert_relative_eq!(lags.lag_90d, 250.0);
        assert_relative_eq!(lags.lag_365d, 100.0);
        assert_relative_eq!(lags.latest, 300.0);
    }

    #[test]
    fn test_recent_only_series_uses_latest_price() {
        let as_of = d(2024, 6, 1);
        let table = PriceTable::from_points(vec![
            point("Maize", "Delhi", d(2024, 5, 1), 10.0),
            point("Maize", "Delhi", d(2024, 5, 30), 12.0),
        ]);
        let lags = LagFeatureCalculator::new(&table).lags("Maize", "Delhi", as_of);
        assert_eq!(lags.as_pair(), (12.0, 12.0));
    }

    #[test]
    fn test_missing_district_falls_back_to_daily_mean() {
        let as_of = d(2024, 6, 1);
        let table = PriceTable::from_points(vec![
            point("Rice", "Adilabad", d(2024, 1, 1), 3000.0),
            point("Rice", "Warangal", d(2024, 1, 1), 3200.0),
            point("Rice", "Adilabad", d(2023, 1, 1), 2000.0),
        ]);
        let lags = LagFeatureCalculator::new(&table).lags("Rice", "Delhi", as_of);
        assert_eq!(lags.coverage, LagCoverage::CropAverage);
        assert_relative_eq!(lags.lag_90d, 3100.0);
        assert_relative_eq!(lags.lag_365d, 2000.0);
    }

    #[test]
    fn test_same_day_ties_keep_table_order() {
        let as_of = d(2024, 6, 1);
        let table = PriceTable::from_points(vec![
            point("Jute", "Kolkata", d(2024, 1, 1), 1.0),
            point("Jute", "Kolkata", d(2024, 1, 1), 2.0),
        ]);
        let lags = LagFeatureCalculator::new(&table).lags("Jute", "Kolkata", as_of);
        // The later table row is the "last" observation for that date
        assert_relative_eq!(lags.lag_90d, 2.0);
        assert_relative_eq!(lags.latest, 2.0);
    }
}
