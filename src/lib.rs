//! Crop Advisor Backend
//!
//! Crop recommendation from soil and climate measurements, plus 90-day
//! harvest price forecasts from historical mandi prices.
//!
//! Module layout:
//! - `models/`: trained classifier / regressor artifacts (inference only)
//! - `classifier`: crop recommendation facade (label, top-k)
//! - `data`: price history loading with Polars
//! - `geo`: coordinates → region bounding-box lookup
//! - `lags`: 90/365-day lag price features
//! - `forecaster`: harvest price forecasts
//! - `price_trends`: recent daily mean prices per crop
//! - `config`: figment-layered runtime configuration
//! - `upstream/`, `api_server` (feature `api`): outbound clients and the
//!   Axum HTTP surface

pub mod utils;
pub mod config;
pub mod crops;
pub mod data;
pub mod geo;
pub mod lags;
pub mod models;
pub mod classifier;
pub mod forecaster;
pub mod price_trends;

#[cfg(feature = "api")]
pub mod upstream;
#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use classifier::{CropClassifier, RankedCrop, SoilClimateFeatures};
pub use config::AppConfig;
pub use crops::CropAliases;
pub use data::{HistoricalPricePoint, PriceTable};
pub use forecaster::{PriceForecast, PriceForecaster};
pub use geo::GeoResolver;
pub use lags::{LagCoverage, LagFeatureCalculator, PriceLags};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppError, AppState};
