//! Scheduler status HTTP endpoint.
//!
//! GET /api/v1/jobs/status — returns the current state of the job
//! registry as JSON.

use axum::extract::State;
use axum::Json;

use crate::services::scheduler::{RegistryState, SharedRegistryState};

/// Get the current scheduler status.
///
/// Returns per-job info (last_started_at, last_finished_at, last_result,
/// runs, skipped) and whether the registry is running.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/status",
    tag = "Jobs",
    responses(
        (status = 200, description = "Current scheduler status", body = RegistryState),
    )
)]
pub async fn get_jobs_status(State(state): State<SharedRegistryState>) -> Json<RegistryState> {
    let s = state.read().await;
    Json(s.clone())
}
