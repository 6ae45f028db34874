use std::collections::HashSet;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use tracing::info;

use crate::engine::types::{Group, Task, UpdateTask};

use super::AppState;
use super::errors::AppError;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: String,
}

// --- Tasks ---

/// GET /tasks/{id}
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(state.store.get_task(&id).await?))
}

/// PUT /tasks/{id}
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<UpdateTask>,
) -> Result<Json<Task>, AppError> {
    let task = state.store.update_task(&id, &update).await?;
    info!(task_id = %id, status = %task.status, "Task updated");
    Ok(Json(task))
}

/// DELETE /tasks/{id}
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    state.store.delete_task(&id).await?;
    Ok(Json(DeletedResponse { deleted: id }))
}

/// POST /tasks
pub async fn provision_task(
    State(state): State<Arc<AppState>>,
    Json(task): Json<Task>,
) -> Result<Json<Task>, AppError> {
    let task = state.store.provision_task(&task).await?;
    info!(task_id = %task.id, name = %task.name, "Task provisioned");
    Ok(Json(task))
}

// --- Jobs ---

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Group>, AppError> {
    Ok(Json(state.store.get_group(&id).await?))
}

/// DELETE /jobs/{id}
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    state.store.delete_group(&id).await?;
    Ok(Json(DeletedResponse { deleted: id }))
}

/// POST /jobs
pub async fn provision_job(
    State(state): State<Arc<AppState>>,
    Json(group): Json<Group>,
) -> Result<Json<Group>, AppError> {
    let mut seen = HashSet::new();
    for task in group.tasks.iter().filter(|t| !t.id.is_empty()) {
        if !seen.insert(task.id.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Task '{}' appears more than once in job",
                task.id
            )));
        }
    }

    let group = state.store.provision_group(&group).await?;
    info!(group_id = %group.id, tasks = group.tasks.len(), "Job provisioned");
    Ok(Json(group))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
