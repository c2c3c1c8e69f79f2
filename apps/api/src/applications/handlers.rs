use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::applications::queries::{
    get_application, list_job_applications, list_my_applications, ApplicationView, JobApplicants,
};
use crate::applications::status::{change_status, StatusChange};
use crate::applications::submission::{
    submit_application, update_application, withdraw_application,
};
use crate::applications::validation::ApplicationForm;
use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::Application;
use crate::relay::trigger::spawn_on_application_created;
use crate::state::AppState;
use crate::store::Record;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub application: Record<Application>,
    pub notification_id: String,
}

/// POST /api/v1/jobs/:id/applications
pub async fn handle_submit(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
    Json(form): Json<ApplicationForm>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let submission = submit_application(state.store.as_ref(), &principal, &job_id, form).await?;
    spawn_on_application_created(&state, &submission);

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            application: submission.application,
            notification_id: submission.notification_id,
        }),
    ))
}

/// GET /api/v1/jobs/:id/applications
pub async fn handle_job_applications(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
) -> Result<Json<JobApplicants>, AppError> {
    let applicants = list_job_applications(state.store.as_ref(), &principal, &job_id).await?;
    Ok(Json(applicants))
}

/// GET /api/v1/applications/mine
pub async fn handle_my_applications(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<ApplicationView>>, AppError> {
    Ok(Json(
        list_my_applications(state.store.as_ref(), &principal).await?,
    ))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<ApplicationView>, AppError> {
    Ok(Json(
        get_application(state.store.as_ref(), &principal, &id).await?,
    ))
}

/// PUT /api/v1/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(form): Json<ApplicationForm>,
) -> Result<Json<Record<Application>>, AppError> {
    let updated = update_application(state.store.as_ref(), &principal, &id, form).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_withdraw_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    withdraw_application(state.store.as_ref(), &principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/applications/:id/status
pub async fn handle_change_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Record<Application>>, AppError> {
    let updated = change_status(state.store.as_ref(), &principal, &id, change).await?;
    Ok(Json(updated))
}
