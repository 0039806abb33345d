//! Service health endpoint.
//!
//! GET /api/v1/health — reports the API version, database reachability and
//! whether the background job registry is running.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::services::scheduler::SharedRegistryState;

/// Shared state for the health endpoint: the DB pool plus a read handle on
/// the job registry.
#[derive(Clone)]
pub(crate) struct HealthState {
    pub(crate) pool: PgPool,
    pub(crate) jobs: SharedRegistryState,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when every subsystem is up, "degraded" otherwise
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the database answered a probe query
    pub database: bool,
    /// Whether the job registry is running
    pub scheduler: bool,
}

/// Service health check.
///
/// Probes the database with a trivial query and reads the job registry's
/// running flag. Always answers 200; the "degraded" status with the failing
/// subsystem flagged lets load balancers tell partial outages from total
/// ones.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Per-subsystem health", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .is_ok();
    let scheduler_ok = state.jobs.read().await.running;

    Json(HealthResponse {
        status: if db_ok && scheduler_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_ok,
        scheduler: scheduler_ok,
    })
}
