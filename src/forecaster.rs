//! Price Forecaster - 90-day harvest price prediction
//!
//! Combines the crop alias table, the region resolver and the lag
//! calculator into the feature row the price model was trained on:
//!
//! | feature          | source                              |
//! |------------------|-------------------------------------|
//! | `crop_id`        | alias of the requested crop token   |
//! | `district_id`    | region resolved from coordinates    |
//! | `month`          | month of `today + 90 days`          |
//! | `day_of_year`    | day-of-year of `today + 90 days`    |
//! | `price_lag_90d`  | lag calculator                      |
//! | `price_lag_365d` | lag calculator                      |
//!
//! The 90-day lag doubles as the reference ("current") price that the
//! forecast change is reported against.

use crate::crops::CropAliases;
use crate::data::PriceTable;
use crate::geo::GeoResolver;
use crate::lags::{LagCoverage, LagFeatureCalculator, PriceLags};
use crate::models::{FeatureRow, ModelError, Regressor, RegressorArtifact};
use crate::utils::round_to;
use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Days between today and the forecast target (expected harvest)
pub const FORECAST_HORIZON_DAYS: i64 = 90;

/// Forecast for one crop at one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceForecast {
    pub crop_name: String,
    pub predicted_price_90d: f64,
    pub current_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub harvest_month: String,
}

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("price model failed for {crop}: {source}")]
    Model {
        crop: String,
        #[source]
        source: ModelError,
    },
    #[error("price model returned a non-finite forecast for {0}")]
    NonFinite(String),
}

/// Percentage change against a reference price, 0 when there is no reference
pub fn percent_change(change: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        change / reference * 100.0
    } else {
        0.0
    }
}

/// Feature row for the price model
pub fn feature_row(crop_id: &str, district_id: &str, target: NaiveDate, lags: &PriceLags) -> FeatureRow {
    FeatureRow::new()
        .category("crop_id", crop_id)
        .category("district_id", district_id)
        .number("month", target.month() as f64)
        .number("day_of_year", target.ordinal() as f64)
        .number("price_lag_90d", lags.lag_90d)
        .number("price_lag_365d", lags.lag_365d)
}

pub struct PriceForecaster {
    aliases: CropAliases,
    geo: GeoResolver,
    table: Arc<PriceTable>,
    model: Box<dyn Regressor>,
}

impl PriceForecaster {
    pub fn new(table: Arc<PriceTable>, model: Box<dyn Regressor>) -> Self {
        Self {
            aliases: CropAliases::builtin(),
            geo: GeoResolver::india(),
            table,
            model,
        }
    }

    /// Load the price model artifact and the price history
    pub fn load(model_path: &Path, data_path: &Path) -> Result<Self> {
        tracing::info!("Loading price model: {}", model_path.display());
        let model = RegressorArtifact::load(model_path)?;

        tracing::info!("Loading price history: {}", data_path.display());
        let table = Arc::new(PriceTable::load(data_path)?);

        Ok(Self::new(table, model))
    }

    pub fn with_aliases(mut self, aliases: CropAliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_geo(mut self, geo: GeoResolver) -> Self {
        self.geo = geo;
        self
    }

    pub fn aliases(&self) -> &CropAliases {
        &self.aliases
    }

    pub fn table(&self) -> &Arc<PriceTable> {
        &self.table
    }

    /// Forecast one crop
    ///
    /// Returns `Ok(None)` for crop tokens without a price-table alias.
    /// Missing price history is not an error: lags fall back to 0 and the
    /// forecast is produced with low confidence.
    pub fn forecast(
        &self,
        crop_token: &str,
        lat: f64,
        lon: f64,
        today: NaiveDate,
    ) -> Result<Option<PriceForecast>, ForecastError> {
        let Some(crop_id) = self.aliases.commodity_for(crop_token) else {
            return Ok(None);
        };

        let district_id = self.geo.resolve(lat, lon);
        let target = today + Duration::days(FORECAST_HORIZON_DAYS);
        let lags = LagFeatureCalculator::new(&self.table).lags(crop_id, district_id, today);

        if lags.coverage == LagCoverage::NoData {
            tracing::warn!("No price history for {} ({}); using zero lags", crop_token, crop_id);
        }
        tracing::debug!(
            "Forecasting {} in {}: lag_90d={}, lag_365d={} ({:?})",
            crop_id,
            district_id,
            lags.lag_90d,
            lags.lag_365d,
            lags.coverage
        );

        let row = feature_row(crop_id, district_id, target, &lags);
        let predicted = self.model.predict(&row).map_err(|source| ForecastError::Model {
            crop: crop_token.to_string(),
            source,
        })?;
        if !predicted.is_finite() {
            return Err(ForecastError::NonFinite(crop_token.to_string()));
        }

        let change = predicted - lags.lag_90d;
        Ok(Some(PriceForecast {
            crop_name: crop_token.to_string(),
            predicted_price_90d: round_to(predicted, 2),
            current_price: lags.lag_90d,
            price_change: round_to(change, 2),
            price_change_percent: round_to(percent_change(change, lags.lag_90d), 2),
            harvest_month: target.format("%B %Y").to_string(),
        }))
    }

    /// Forecast several crops at one location
    ///
    /// Each crop is evaluated independently; unmapped crops and failures are
    /// left out of the result (failures are logged). Request order is kept.
    pub fn forecast_batch(&self, crop_tokens: &[String], lat: f64, lon: f64, today: NaiveDate) -> Vec<PriceForecast> {
        let outcomes: Vec<(&String, Result<Option<PriceForecast>, ForecastError>)> = crop_tokens
            .par_iter()
            .map(|token| (token, self.forecast(token, lat, lon, today)))
            .collect();

        outcomes
            .into_iter()
            .filter_map(|(token, outcome)| match outcome {
                Ok(Some(forecast)) => Some(forecast),
                Ok(None) => {
                    tracing::debug!("Skipping crop without price alias: {}", token);
                    None
                }
                Err(e) => {
                    tracing::warn!("Price forecast failed for {}: {}", token, e);
                    None
                }
            })
            .collect()
    }
}
