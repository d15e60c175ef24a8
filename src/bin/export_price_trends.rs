//! Export 30-day price trends for the dashboard charts
//!
//! Reads the mandi price history and writes, for every crop the classifier
//! can recommend, the daily mean price over its most recent 30 dates.
//!
//! Usage:
//!   cargo run --bin export_price_trends -- [PRICE_DATA] [OUTPUT_JSON]
//!
//! Defaults: `models/price_history.csv` → `crop_price_data.json`

use crop_advisor::price_trends::{price_trends, DEFAULT_TREND_DAYS};
use crop_advisor::{CropAliases, PriceTable};
use std::path::Path;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let data_path = args.get(1).map(String::as_str).unwrap_or("models/price_history.csv");
    let output_path = args.get(2).map(String::as_str).unwrap_or("crop_price_data.json");

    println!("\n{}", "=".repeat(70));
    println!("Price Trend Export");
    println!("{}", "=".repeat(70));
    println!();
    println!("  Input:  {}", data_path);
    println!("  Output: {}", output_path);
    println!();

    let load_start = Instant::now();
    let table = PriceTable::load(Path::new(data_path))?;
    println!(
        "Loaded:  {} rows ({} dropped) in {:.3} ms",
        table.len(),
        table.dropped_rows(),
        load_start.elapsed().as_secs_f64() * 1000.0
    );

    let aliases = CropAliases::builtin();
    let trends = price_trends(&aliases, &table, DEFAULT_TREND_DAYS);

    for (token, commodity) in aliases.iter() {
        match trends.get(token) {
            Some(points) => println!("  {:<12} {:>3} days  ({})", token, points.len(), commodity),
            None => println!("  {:<12} no data   ({})", token, commodity),
        }
    }

    let json = serde_json::to_string_pretty(&trends)?;
    std::fs::write(output_path, json)?;

    println!();
    println!("Wrote {} crops to {}", trends.len(), output_path);
    println!("{}", "=".repeat(70));

    Ok(())
}
