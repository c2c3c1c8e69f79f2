use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::Principal;
use crate::errors::AppError;
use crate::jobs::service::{
    create_job, delete_job, get_job, list_jobs, list_owned_jobs, update_job, JobFilter, JobInput,
    JobPatch,
};
use crate::models::Job;
use crate::state::AppState;
use crate::store::Record;

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<Vec<Record<Job>>>, AppError> {
    Ok(Json(list_jobs(state.store.as_ref(), &filter).await?))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<JobInput>,
) -> Result<(StatusCode, Json<Record<Job>>), AppError> {
    let job = create_job(state.store.as_ref(), &principal, input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs/mine
pub async fn handle_my_jobs(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Record<Job>>>, AppError> {
    Ok(Json(list_owned_jobs(state.store.as_ref(), &principal).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record<Job>>, AppError> {
    Ok(Json(get_job(state.store.as_ref(), &id).await?))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> Result<Json<Record<Job>>, AppError> {
    Ok(Json(
        update_job(state.store.as_ref(), &principal, &id, patch).await?,
    ))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    delete_job(state.store.as_ref(), &principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
