//! Weather HTTP endpoints.
//!
//! - GET /api/v1/weather?limit=N — recent observations, newest first
//! - GET /api/v1/weather/latest — most recent observation
//! - POST /api/v1/weather/fetch — run the ingestion job now
//! - POST /api/v1/weather/purge — run the retention sweep now
//!
//! Records are read-only over HTTP; the only writes are the two manual
//! triggers, which share their in-flight guards with the scheduler so a
//! manual run can never overlap a scheduled one.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::{IntoParams, ToSchema};

use crate::config::AppConfig;
use crate::db::{models, queries};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{kelvin_to_celsius, kelvin_to_fahrenheit, metres_to_km};
use crate::services::ingest::{self, IngestReport};
use crate::services::owm::OwmClient;
use crate::services::scheduler::JobGuard;

/// Default and maximum page size for the observation list.
const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;

/// Shared application state for weather endpoints.
#[derive(Clone)]
pub(crate) struct WeatherState {
    pub(crate) pool: PgPool,
    pub(crate) client: OwmClient,
    pub(crate) config: AppConfig,
    /// Same guards the scheduler uses for the two recurring jobs.
    pub(crate) fetch_guard: JobGuard,
    pub(crate) purge_guard: JobGuard,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WeatherListQuery {
    /// Maximum number of records to return (newest first), capped at 1000
    pub limit: Option<i64>,
}

/// One weather observation, with derived unit conversions computed on read.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherResponse {
    pub id: i64,
    pub city_name: String,
    pub country_code: String,
    pub longitude: f64,
    pub latitude: f64,
    pub weather_id: i32,
    pub weather_main: String,
    pub weather_description: String,
    pub weather_icon: String,
    /// Kelvin, as stored
    pub temperature: f64,
    /// Derived: temperature − 273.15
    pub temperature_celsius: f64,
    /// Derived: (temperature − 273.15) · 9/5 + 32
    pub temperature_fahrenheit: f64,
    pub feels_like: f64,
    pub feels_like_celsius: f64,
    pub feels_like_fahrenheit: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// hPa
    pub pressure: i32,
    /// Percent
    pub humidity: i32,
    /// Metres, when reported
    pub visibility: Option<i32>,
    /// Derived: visibility / 1000
    pub visibility_km: Option<f64>,
    pub wind_speed: f64,
    pub wind_degree: i32,
    pub wind_gust: Option<f64>,
    pub clouds: i32,
    /// ISO 8601 / RFC 3339
    pub sunrise: String,
    pub sunset: String,
    pub api_timestamp: String,
    /// Seconds from UTC
    pub timezone_offset: i32,
    pub created_at: String,
}

impl From<models::WeatherRecord> for WeatherResponse {
    fn from(r: models::WeatherRecord) -> Self {
        Self {
            id: r.id,
            city_name: r.city_name,
            country_code: r.country_code,
            longitude: r.longitude,
            latitude: r.latitude,
            weather_id: r.weather_id,
            weather_main: r.weather_main,
            weather_description: r.weather_description,
            weather_icon: r.weather_icon,
            temperature: r.temperature,
            temperature_celsius: kelvin_to_celsius(r.temperature),
            temperature_fahrenheit: kelvin_to_fahrenheit(r.temperature),
            feels_like: r.feels_like,
            feels_like_celsius: kelvin_to_celsius(r.feels_like),
            feels_like_fahrenheit: kelvin_to_fahrenheit(r.feels_like),
            temp_min: r.temp_min,
            temp_max: r.temp_max,
            pressure: r.pressure,
            humidity: r.humidity,
            visibility: r.visibility,
            visibility_km: r.visibility.map(metres_to_km),
            wind_speed: r.wind_speed,
            wind_degree: r.wind_degree,
            wind_gust: r.wind_gust,
            clouds: r.clouds,
            sunrise: r.sunrise.to_rfc3339(),
            sunset: r.sunset.to_rfc3339(),
            api_timestamp: r.api_timestamp.to_rfc3339(),
            timezone_offset: r.timezone_offset,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// Result of a manual retention sweep.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurgeResponse {
    /// Number of records removed
    pub deleted: u64,
    /// Retention window that was applied, in days
    pub retention_days: i64,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// List recent weather observations.
#[utoipa::path(
    get,
    path = "/api/v1/weather",
    tag = "Weather",
    params(WeatherListQuery),
    responses(
        (status = 200, description = "Recent observations, newest first", body = Vec<WeatherResponse>),
    )
)]
pub async fn list_weather(
    State(state): State<WeatherState>,
    Query(query): Query<WeatherListQuery>,
) -> Result<Json<Vec<WeatherResponse>>, AppError> {
    let records = queries::list_weather_records(&state.pool, clamp_limit(query.limit)).await?;
    Ok(Json(records.into_iter().map(WeatherResponse::from).collect()))
}

/// Get the most recent weather observation.
#[utoipa::path(
    get,
    path = "/api/v1/weather/latest",
    tag = "Weather",
    responses(
        (status = 200, description = "The latest observation", body = WeatherResponse),
        (status = 404, description = "No observations recorded yet", body = ErrorResponse),
    )
)]
pub async fn get_latest_weather(
    State(state): State<WeatherState>,
) -> Result<Json<WeatherResponse>, AppError> {
    let record = queries::get_latest_weather_record(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No weather records yet".to_string()))?;
    Ok(Json(record.into()))
}

/// Run the weather ingestion job now.
///
/// Synchronous: responds once the fetch-validate-persist cycle finishes,
/// with the same report the scheduler would log. The `success` flag tells
/// failure from success; the HTTP status is 200 either way.
#[utoipa::path(
    post,
    path = "/api/v1/weather/fetch",
    tag = "Weather",
    responses(
        (status = 200, description = "Job report (check the success flag)", body = IngestReport),
        (status = 409, description = "A fetch run is already in progress", body = ErrorResponse),
    )
)]
pub async fn trigger_fetch(State(state): State<WeatherState>) -> Result<Json<IngestReport>, AppError> {
    let Some(_permit) = state.fetch_guard.try_acquire() else {
        return Err(AppError::Conflict(
            "Weather fetch is already in progress".to_string(),
        ));
    };

    let report = ingest::run(&state.pool, &state.client, &state.config).await;
    Ok(Json(report))
}

/// Run the retention sweep now.
#[utoipa::path(
    post,
    path = "/api/v1/weather/purge",
    tag = "Weather",
    responses(
        (status = 200, description = "Number of records purged", body = PurgeResponse),
        (status = 409, description = "A purge run is already in progress", body = ErrorResponse),
    )
)]
pub async fn trigger_purge(State(state): State<WeatherState>) -> Result<Json<PurgeResponse>, AppError> {
    let Some(_permit) = state.purge_guard.try_acquire() else {
        return Err(AppError::Conflict(
            "Weather purge is already in progress".to_string(),
        ));
    };

    let retention_days = state.config.weather_retention_days;
    let deleted =
        ingest::purge_older_than(&state.pool, chrono::Duration::days(retention_days)).await?;
    Ok(Json(PurgeResponse {
        deleted,
        retention_days,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_record() -> models::WeatherRecord {
        models::WeatherRecord {
            id: 1,
            city_name: "Moscow".to_string(),
            country_code: "RU".to_string(),
            longitude: 37.61,
            latitude: 55.75,
            weather_id: 800,
            weather_main: "Clear".to_string(),
            weather_description: "clear sky".to_string(),
            weather_icon: "01d".to_string(),
            temperature: 300.0,
            feels_like: 298.15,
            temp_min: 299.0,
            temp_max: 301.0,
            pressure: 1012,
            humidity: 40,
            visibility: Some(10000),
            wind_speed: 2.0,
            wind_degree: 90,
            wind_gust: None,
            clouds: 0,
            sunrise: Utc.with_ymd_and_hms(2025, 6, 1, 2, 45, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2025, 6, 1, 19, 5, 0).unwrap(),
            api_timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            timezone_offset: 10800,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 5).unwrap(),
        }
    }

    #[test]
    fn test_weather_response_derived_fields() {
        let response = WeatherResponse::from(sample_record());
        assert_eq!(response.temperature_celsius, 26.85);
        assert_eq!(response.temperature_fahrenheit, 80.33);
        assert_eq!(response.feels_like_celsius, 25.0);
        assert_eq!(response.visibility_km, Some(10.0));
    }

    #[test]
    fn test_weather_response_missing_visibility() {
        let mut record = sample_record();
        record.visibility = None;
        let response = WeatherResponse::from(record);
        assert_eq!(response.visibility, None);
        assert_eq!(response.visibility_km, None);
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(50)), 50);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIST_LIMIT);
    }
}
