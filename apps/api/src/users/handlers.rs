use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::UserProfile;
use crate::state::AppState;
use crate::users::profile::{get_profile, record_login, set_admin, update_profile, ProfileUpdate};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminToggle {
    pub is_admin: bool,
}

/// POST /api/v1/users/me/login
pub async fn handle_login(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(record_login(state.store.as_ref(), &principal).await?))
}

/// GET /api/v1/users/me
pub async fn handle_get_me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(get_profile(state.store.as_ref(), &principal).await?))
}

/// PATCH /api/v1/users/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    principal: Principal,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(
        update_profile(state.store.as_ref(), &principal, update).await?,
    ))
}

/// POST /api/v1/admin/users/:uid/admin
pub async fn handle_set_admin(
    State(state): State<AppState>,
    principal: Principal,
    Path(uid): Path<String>,
    Json(req): Json<AdminToggle>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(
        set_admin(state.store.as_ref(), &principal, &uid, req.is_admin).await?,
    ))
}
