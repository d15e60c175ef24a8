//! Price History Loading
//!
//! Loads the historical mandi price table (`date, crop_id, district_id, price`)
//! with Polars and materialises it into typed rows. Rows whose date or price
//! cannot be parsed are dropped at load time and counted.
//!
//! The table is immutable after loading and is shared behind an `Arc` by the
//! price forecaster and the price-trend endpoint.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::Path;

/// One observed price
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalPricePoint {
    pub crop_id: String,
    pub district_id: String,
    pub date: NaiveDate,
    pub price: f64,
}

impl HistoricalPricePoint {
    pub fn new(crop_id: &str, district_id: &str, date: NaiveDate, price: f64) -> Self {
        Self {
            crop_id: crop_id.to_string(),
            district_id: district_id.to_string(),
            date,
            price,
        }
    }
}

/// In-memory price history
///
/// Rows keep file order; `by_crop` indexes them per commodity so lag lookups
/// only scan one crop's rows.
#[derive(Debug, Default)]
pub struct PriceTable {
    points: Vec<HistoricalPricePoint>,
    by_crop: FxHashMap<String, Vec<usize>>,
    dropped_rows: usize,
}

impl PriceTable {
    /// Load from CSV or Parquet (chosen by file extension)
    pub fn load(path: &Path) -> Result<Self> {
        let df = Self::read_frame(path)?;
        let table = Self::from_frame(&df)
            .with_context(|| format!("Failed to read price rows from {}", path.display()))?;

        tracing::info!(
            "Loaded price history: {} rows, {} crops ({} rows dropped)",
            table.len(),
            table.by_crop.len(),
            table.dropped_rows
        );
        if table.dropped_rows > 0 {
            tracing::warn!(
                "Dropped {} price rows with unparseable date or price",
                table.dropped_rows
            );
        }

        Ok(table)
    }

    fn read_frame(path: &Path) -> Result<DataFrame> {
        let is_parquet = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("parquet"))
            .unwrap_or(false);

        if is_parquet {
            LazyFrame::scan_parquet(path, Default::default())
                .with_context(|| format!("Failed to scan parquet: {}", path.display()))?
                .select(&[col("date"), col("crop_id"), col("district_id"), col("price")])
                .collect()
                .with_context(|| format!("Failed to load price parquet: {}", path.display()))
        } else {
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(None)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))
                .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
                .finish()
                .with_context(|| format!("Failed to load price CSV: {}", path.display()))
        }
    }

    /// Materialise typed rows from a loaded frame
    ///
    /// Identifier columns are cast to strings and prices to f64, so numeric
    /// district codes and integer prices load the same way as text.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let dates = df
            .column("date")
            .with_context(|| "Column 'date' not found")?
            .cast(&DataType::String)?;
        let crops = df
            .column("crop_id")
            .with_context(|| "Column 'crop_id' not found")?
            .cast(&DataType::String)?;
        let districts = df
            .column("district_id")
            .with_context(|| "Column 'district_id' not found")?
            .cast(&DataType::String)?;
        let prices = df
            .column("price")
            .with_context(|| "Column 'price' not found")?
            .cast(&DataType::Float64)?;

        let dates = dates.str()?;
        let crops = crops.str()?;
        let districts = districts.str()?;
        let prices = prices.f64()?;

        let mut points = Vec::with_capacity(df.height());
        let mut dropped_rows = 0;

        for idx in 0..df.height() {
            let row = (
                dates.get(idx).and_then(parse_price_date),
                crops.get(idx),
                districts.get(idx),
                prices.get(idx).filter(|p| p.is_finite() && *p >= 0.0),
            );
            match row {
                (Some(date), Some(crop), Some(district), Some(price)) => {
                    points.push(HistoricalPricePoint::new(crop, district, date, price));
                }
                _ => dropped_rows += 1,
            }
        }

        let mut table = Self::from_points(points);
        table.dropped_rows = dropped_rows;
        Ok(table)
    }

    pub fn from_points(points: Vec<HistoricalPricePoint>) -> Self {
        let mut by_crop: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (idx, point) in points.iter().enumerate() {
            by_crop.entry(point.crop_id.clone()).or_default().push(idx);
        }
        Self {
            points,
            by_crop,
            dropped_rows: 0,
        }
    }

    /// Rows for one crop, in table order
    pub fn crop_points<'a>(&'a self, crop_id: &str) -> impl Iterator<Item = &'a HistoricalPricePoint> + 'a {
        self.by_crop
            .get(crop_id)
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&i| &self.points[i])
    }

    /// Mean price per date across all districts, sorted by date
    pub fn daily_means(&self, crop_id: &str) -> Vec<(NaiveDate, f64)> {
        let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for point in self.crop_points(crop_id) {
            let entry = by_date.entry(point.date).or_insert((0.0, 0));
            entry.0 += point.price;
            entry.1 += 1;
        }
        by_date
            .into_iter()
            .map(|(date, (sum, n))| (date, sum / n as f64))
            .collect()
    }

    pub fn contains_crop(&self, crop_id: &str) -> bool {
        self.by_crop.contains_key(crop_id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }
}

/// Parse the date formats seen in mandi exports
///
/// Accepts ISO dates (optionally with a time part) and day-first dates with
/// `-` or `/` separators.
pub fn parse_price_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fixture(name: &str) -> String {
        format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_price_date() {
        assert_eq!(parse_price_date("2024-03-05"), Some(d(2024, 3, 5)));
        assert_eq!(parse_price_date(" 05-03-2024 "), Some(d(2024, 3, 5)));
        assert_eq!(parse_price_date("05/03/2024"), Some(d(2024, 3, 5)));
        assert_eq!(parse_price_date("2024-03-05 10:30:00"), Some(d(2024, 3, 5)));
        assert_eq!(parse_price_date("not-a-date"), None);
        assert_eq!(parse_price_date(""), None);
        assert_eq!(parse_price_date("2024-02-30"), None);
    }

    #[test]
    fn test_load_fixture_csv() {
        let table = PriceTable::load(Path::new(&fixture("price_history.csv"))).expect("fixture should load");
        // One row has a bad date, one has an empty price
        assert_eq!(table.dropped_rows(), 2);
        assert_eq!(table.len(), 7);
        assert!(table.contains_crop("Maize"));
        assert!(!table.contains_crop("Wheat"));
        assert_eq!(table.crop_points("Rice").count(), 2);
    }

    #[test]
    fn test_from_frame_casts_columns() {
        let df = df!(
            "date" => ["2024-01-01", "2024-01-02", "garbage"],
            "crop_id" => ["Maize", "Maize", "Maize"],
            "district_id" => [101i64, 102, 103],
            "price" => [1500i64, 1600, 1700],
        )
        .unwrap();

        let table = PriceTable::from_frame(&df).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.dropped_rows(), 1);
        let first = table.crop_points("Maize").next().unwrap();
        assert_eq!(first.district_id, "101");
        assert_relative_eq!(first.price, 1500.0);
    }

    #[test]
    fn test_daily_means_across_districts() {
        let table = PriceTable::from_points(vec![
            HistoricalPricePoint::new("Rice", "A", d(2024, 1, 2), 10.0),
            HistoricalPricePoint::new("Rice", "B", d(2024, 1, 2), 20.0),
            HistoricalPricePoint::new("Rice", "A", d(2024, 1, 1), 5.0),
            HistoricalPricePoint::new("Jute", "A", d(2024, 1, 1), 99.0),
        ]);
        let means = table.daily_means("Rice");
        assert_eq!(means, vec![(d(2024, 1, 1), 5.0), (d(2024, 1, 2), 15.0)]);
        assert!(table.daily_means("Wheat").is_empty());
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let df = df!("date" => ["2024-01-01"], "price" => [1.0]).unwrap();
        assert!(PriceTable::from_frame(&df).is_err());
    }
}
