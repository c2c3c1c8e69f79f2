use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::auth::Principal;
use crate::errors::AppError;
use crate::notifications::inbox::{
    delete_all, delete_notification, list_inbox, mark_all_read, mark_read, unread_count,
    InboxItem,
};
use crate::state::AppState;

#[derive(Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// GET /api/v1/notifications
pub async fn handle_list(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<InboxItem>>, AppError> {
    Ok(Json(list_inbox(state.store.as_ref(), &principal).await?))
}

/// GET /api/v1/notifications/unread-count
pub async fn handle_unread_count(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<CountResponse>, AppError> {
    let count = unread_count(state.store.as_ref(), &principal).await?;
    Ok(Json(CountResponse { count }))
}

/// PATCH /api/v1/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    mark_read(state.store.as_ref(), &principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn handle_mark_all_read(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<CountResponse>, AppError> {
    let count = mark_all_read(state.store.as_ref(), &principal).await?;
    Ok(Json(CountResponse { count }))
}

/// DELETE /api/v1/notifications/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    delete_notification(state.store.as_ref(), &principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/notifications
pub async fn handle_delete_all(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<CountResponse>, AppError> {
    let count = delete_all(state.store.as_ref(), &principal).await?;
    Ok(Json(CountResponse { count }))
}
