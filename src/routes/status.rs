use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::job::JobSnapshot;

/// GET /status/{job_id} — current `{status, result}` of a job.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<JobSnapshot>> {
    Uuid::parse_str(&job_id)
        .ok()
        .and_then(|id| state.jobs.status(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Job not found.".to_string()))
}
