// Axum API Server Module
//
// Purpose: REST API for crop recommendation, harvest price forecasts and the
// assistant proxies (chat, translation, weather, soil)

use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};

use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use moka::future::Cache;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::{CropClassifier, SoilClimateFeatures};
use crate::config::AppConfig;
use crate::forecaster::PriceForecaster;
use crate::price_trends::{price_trends, DEFAULT_TREND_DAYS};
use crate::upstream::{resolve_pair, UpstreamClients, UpstreamError};

// ============================================================================
// Application State
// ============================================================================

/// Shared, read-only handles built once at startup
///
/// A model that failed to load is `None`; the server still starts and the
/// endpoints depending on it answer with a 500.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Option<Arc<CropClassifier>>,
    pub forecaster: Option<Arc<PriceForecaster>>,
    pub upstream: UpstreamClients,
    /// Weather, soil and price-trend responses (5 min TTL)
    pub cache: Cache<String, serde_json::Value>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading crop classifier...");
        let classifier = match CropClassifier::load(&config.classifier_path(), &config.label_encoder_path()) {
            Ok(classifier) => Some(classifier),
            Err(e) => {
                tracing::warn!("Crop classifier unavailable: {:#}", e);
                None
            }
        };

        tracing::info!("Loading price forecaster...");
        let forecaster = match PriceForecaster::load(&config.price_model_path(), &config.price_data_path()) {
            Ok(forecaster) => Some(forecaster),
            Err(e) => {
                tracing::warn!("Price service unavailable: {:#}", e);
                None
            }
        };

        Self::from_parts(config, classifier, forecaster)
    }

    pub fn from_parts(
        config: AppConfig,
        classifier: Option<CropClassifier>,
        forecaster: Option<PriceForecaster>,
    ) -> anyhow::Result<Self> {
        let upstream = UpstreamClients::from_config(&config)?;

        tracing::info!("Initializing Moka cache...");
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(300))
            .build();

        Ok(Self {
            classifier: classifier.map(Arc::new),
            forecaster: forecaster.map(Arc::new),
            upstream,
            cache,
            config: Arc::new(config),
        })
    }
}

// ============================================================================
// Router Configuration
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        // Crop recommendation
        .route("/predict", post(predict_crop))
        .route("/predict-top3", post(predict_top3))
        // Prices
        .route("/predict-prices", post(predict_prices))
        .route("/price-trends", get(get_price_trends))
        // Assistant proxies
        .route("/chat", post(chat))
        .route("/translate", post(translate))
        .route("/weather", get(get_weather))
        .route("/soil", get(get_soil))
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    match config.cors_origin_list() {
        None => CorsLayer::permissive(),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE])
        }
    }
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "model_loaded": state.classifier.is_some(),
        "price_service_loaded": state.forecaster.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn predict_crop(
    State(state): State<AppState>,
    payload: Result<Json<SoilClimateFeatures>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(features) = payload?;
    let classifier = state.classifier.as_ref().ok_or(AppError::NotLoaded("Model not loaded"))?;

    let crop = classifier
        .classify(&features)
        .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))?;
    tracing::debug!("Predicted {} for {:?}", crop, features);

    Ok(Json(serde_json::json!({ "predicted_crop": crop })))
}

async fn predict_top3(
    State(state): State<AppState>,
    payload: Result<Json<SoilClimateFeatures>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(features) = payload?;
    let classifier = state.classifier.as_ref().ok_or(AppError::NotLoaded("Model not loaded"))?;

    let top3 = classifier
        .top_k(&features, 3)
        .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))?;

    Ok(Json(serde_json::json!({ "top3": top3.into_vec() })))
}

async fn predict_prices(
    State(state): State<AppState>,
    payload: Result<Json<PricePredictionRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(req) = payload?;
    if req.crops.is_empty() {
        return Err(AppError::BadRequest("No crops provided".to_string()));
    }
    let forecaster = state
        .forecaster
        .clone()
        .ok_or(AppError::NotLoaded("Price service not loaded"))?;

    tracing::info!(
        "Forecasting {} crops at ({}, {})",
        req.crops.len(),
        req.latitude,
        req.longitude
    );

    // CPU-bound work: run in blocking thread pool
    let today = chrono::Local::now().date_naive();
    let predictions = tokio::task::spawn_blocking(move || {
        forecaster.forecast_batch(&req.crops, req.latitude, req.longitude, today)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    Ok(Json(serde_json::json!({ "price_predictions": predictions })))
}

async fn get_price_trends(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let forecaster = state
        .forecaster
        .as_ref()
        .ok_or(AppError::NotLoaded("Price service not loaded"))?;

    let cache_key = "price-trends".to_string();
    if let Some(cached) = state.cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let trends = price_trends(forecaster.aliases(), forecaster.table(), DEFAULT_TREND_DAYS);
    let value = serde_json::to_value(trends)
        .map_err(|e| AppError::Internal(format!("JSON serialization error: {}", e)))?;
    state.cache.insert(cache_key, value.clone()).await;

    Ok(Json(value))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    if req.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("Missing prompt".to_string()));
    }
    let client = state
        .upstream
        .chat
        .as_ref()
        .ok_or(AppError::NotLoaded("Chat service not configured"))?;

    let stream = client
        .stream(&req.prompt)
        .await
        .map_err(|e| AppError::Upstream(format!("Chat request failed: {}", e)))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(req) = payload?;
    if req.text.is_empty() {
        return Err(AppError::BadRequest("Missing text to translate".to_string()));
    }
    let pair = resolve_pair(&req.source, &req.target).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Translation not supported: {} to {}. Only en↔hi supported.",
            req.source, req.target
        ))
    })?;

    let translated = state
        .upstream
        .translate
        .translate(&req.text, pair)
        .await
        .map_err(|e| match e {
            UpstreamError::Rejected(reason) => {
                tracing::warn!("Translation rejected: {}", reason);
                AppError::Upstream("Translation failed".to_string())
            }
            other => AppError::Upstream(format!("Translation request failed: {}", other)),
        })?;

    Ok(Json(serde_json::json!({ "translatedText": translated })))
}

async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<CoordinateQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(coords) = query?;
    coords.validate()?;
    let client = state
        .upstream
        .weather
        .as_ref()
        .ok_or(AppError::NotLoaded("Weather service not configured"))?;

    let cache_key = format!("weather:{:.3}:{:.3}", coords.lat, coords.lon);
    if let Some(cached) = state.cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let reading = client
        .current(coords.lat, coords.lon)
        .await
        .map_err(|e| AppError::Upstream(format!("Weather request failed: {}", e)))?;
    let value = serde_json::to_value(reading)
        .map_err(|e| AppError::Internal(format!("JSON serialization error: {}", e)))?;
    state.cache.insert(cache_key, value.clone()).await;

    Ok(Json(value))
}

async fn get_soil(
    State(state): State<AppState>,
    query: Result<Query<CoordinateQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(coords) = query?;
    coords.validate()?;

    let cache_key = format!("soil:{:.3}:{:.3}", coords.lat, coords.lon);
    if let Some(cached) = state.cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let reading = state
        .upstream
        .soil
        .topsoil(coords.lat, coords.lon)
        .await
        .map_err(|e| AppError::Upstream(format!("Soil request failed: {}", e)))?;
    let value = serde_json::to_value(reading)
        .map_err(|e| AppError::Internal(format!("JSON serialization error: {}", e)))?;
    state.cache.insert(cache_key, value.clone()).await;

    Ok(Json(value))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize, Debug)]
struct PricePredictionRequest {
    crops: Vec<String>,
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize, Debug)]
struct ChatRequest {
    #[serde(default)]
    prompt: String,
}

#[derive(Deserialize, Debug)]
struct TranslateRequest {
    #[serde(default)]
    text: String,
    #[serde(default = "default_source")]
    source: String,
    #[serde(default = "default_target")]
    target: String,
}

fn default_source() -> String {
    "auto".to_string()
}

fn default_target() -> String {
    "hi".to_string()
}

#[derive(Deserialize, Debug)]
struct CoordinateQuery {
    lat: f64,
    lon: f64,
}

impl CoordinateQuery {
    fn validate(&self) -> Result<(), AppError> {
        if self.lat.is_finite() && self.lon.is_finite() {
            Ok(())
        } else {
            Err(AppError::BadRequest("Invalid coordinates".to_string()))
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotLoaded(&'static str),
    Upstream(String),
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotLoaded(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string()),
            AppError::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        if status.is_server_error() {
            tracing::error!("{}", message);
        }

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
