//! Queue introspection endpoints

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::queue::{JobInfo, QueueInfo};

use super::{ApiError, AppState};

/// GET /api/job-status/{job_id}
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobInfo>, ApiError> {
    let info = state
        .queue
        .job_status(&job_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(info))
}

/// GET /api/queue-info
pub async fn get_queue_info(
    State(state): State<AppState>,
) -> Result<Json<QueueInfo>, ApiError> {
    let info = state
        .queue
        .queue_info()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(info))
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let queue = state.queue.queue_info().await.ok();
    Json(json!({
        "status": "ok",
        "queue_length": queue.as_ref().map(|q| q.queue_length),
        "worker_alive": queue.as_ref().map(|q| q.worker_alive),
    }))
}
