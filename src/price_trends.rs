//! Recent price trends per crop, for charting
//!
//! For every aliased crop with history, the daily mean price across
//! districts over the most recent `days` dates.

use crate::crops::CropAliases;
use crate::data::PriceTable;
use crate::utils::round_to;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_TREND_DAYS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTrendPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    pub price: f64,
    /// 1-based position within the window
    pub day: usize,
}

/// Crop token → trend points, crops without history omitted
pub fn price_trends(aliases: &CropAliases, table: &PriceTable, days: usize) -> BTreeMap<String, Vec<PriceTrendPoint>> {
    let mut trends = BTreeMap::new();

    for (token, commodity) in aliases.iter() {
        let means = table.daily_means(commodity);
        if means.is_empty() {
            continue;
        }

        let start = means.len().saturating_sub(days);
        let points = means[start..]
            .iter()
            .enumerate()
            .map(|(i, (date, price))| PriceTrendPoint {
                date: date.format("%Y-%m-%d").to_string(),
                price: round_to(*price, 2),
                day: i + 1,
            })
            .collect();
        trends.insert(token.to_string(), points);
    }

    trends
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::HistoricalPricePoint;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_keeps_last_days_and_numbers_from_one() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut points: Vec<HistoricalPricePoint> = (0..40)
            .map(|i| HistoricalPricePoint::new("Maize", "Delhi", start + Duration::days(i), i as f64))
            .collect();
        points.push(HistoricalPricePoint::new("Maize", "Adilabad", start + Duration::days(39), 40.0));
        let table = PriceTable::from_points(points);

        let trends = price_trends(&CropAliases::builtin(), &table, DEFAULT_TREND_DAYS);
        assert_eq!(trends.len(), 1);

        let maize = &trends["maize"];
        assert_eq!(maize.len(), 30);
        assert_eq!(maize[0].day, 1);
        assert_eq!(maize[0].date, "2024-01-11");
        assert_eq!(maize[29].day, 30);
        // Mean of 39 (Delhi) and 40 (Adilabad)
        assert_eq!(maize[29].price, 39.5);
    }

    #[test]
    fn test_empty_table_has_no_trends() {
        let trends = price_trends(&CropAliases::builtin(), &PriceTable::default(), 30);
        assert!(trends.is_empty());
    }
}
