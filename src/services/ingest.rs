//! Weather ingestion job: fetch → validate → persist → report.
//!
//! Runs on the scheduler's timer and on the manual HTTP trigger. Each
//! successful run inserts exactly one new record; history is append-only
//! (no dedup against prior records) and trimmed separately by the
//! retention purge. A failed fetch or validation makes zero writes.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::FetchError;
use crate::services::owm::OwmClient;

/// Outcome of one ingestion run, surfaced to the scheduler log and to the
/// manual-trigger HTTP response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngestReport {
    pub success: bool,
    pub message: String,
}

impl IngestReport {
    fn ok(city: &str) -> Self {
        Self {
            success: true,
            message: format!("Weather data for {} stored successfully", city),
        }
    }

    fn failed(err: &FetchError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
        }
    }
}

/// Execute one fetch-validate-persist cycle.
///
/// Never panics and never retries within the run; every failure mode is
/// logged and folded into the report so the caller (scheduler tick or
/// manual trigger) can surface it.
pub async fn run(pool: &PgPool, client: &OwmClient, config: &AppConfig) -> IngestReport {
    match try_run(pool, client, config).await {
        Ok(city) => {
            let report = IngestReport::ok(&city);
            tracing::info!("{}", report.message);
            report
        }
        Err(err) => {
            tracing::error!("Weather ingestion failed: {}", err);
            IngestReport::failed(&err)
        }
    }
}

async fn try_run(pool: &PgPool, client: &OwmClient, config: &AppConfig) -> Result<String, FetchError> {
    if !config.has_api_key() {
        return Err(FetchError::Configuration(
            "OPENWEATHER_API_KEY is not set".to_string(),
        ));
    }

    let candidate = client
        .fetch_current(config.weather_latitude, config.weather_longitude)
        .await?;

    candidate.validate().map_err(FetchError::Validation)?;

    // Single-statement insert: either the whole record lands or nothing does.
    let record = queries::insert_weather_record(pool, &candidate)
        .await
        .map_err(|e| FetchError::Storage(format!("database write failed: {}", e)))?;

    Ok(record.city_name)
}

/// Delete records with `created_at` strictly older than `now − older_than`.
///
/// Returns the number of rows deleted; calling it again immediately
/// deletes zero.
pub async fn purge_older_than(pool: &PgPool, older_than: Duration) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - older_than;
    let deleted = queries::delete_weather_records_before(pool, cutoff).await?;
    if deleted > 0 {
        tracing::info!("Purged {} weather record(s) older than {}", deleted, cutoff);
    } else {
        tracing::debug!("Weather purge found nothing older than {}", cutoff);
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success_names_the_city() {
        let report = IngestReport::ok("Moscow");
        assert!(report.success);
        assert!(report.message.contains("Moscow"));
    }

    #[test]
    fn test_report_failure_carries_the_reason() {
        let err = FetchError::Provider {
            status: Some(401),
            detail: "Invalid API key".to_string(),
        };
        let report = IngestReport::failed(&err);
        assert!(!report.success);
        assert!(report.message.contains("Invalid API key"));
    }

    #[test]
    fn test_report_configuration_failure() {
        let err = FetchError::Configuration("OPENWEATHER_API_KEY is not set".to_string());
        let report = IngestReport::failed(&err);
        assert!(!report.success);
        assert!(report.message.contains("OPENWEATHER_API_KEY"));
    }
}
