use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::{NotificationPreferences, UserProfile, UserType};
use crate::store::{get_record, set_record, Collection, DocumentStore, Record, WriteBatch};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub user_type: Option<UserType>,
    pub notification_preferences: Option<NotificationPreferences>,
    pub push_token: Option<String>,
}

async fn load_profile(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Option<Record<UserProfile>>, AppError> {
    Ok(get_record(store, Collection::Users, uid).await?)
}

/// Called on every sign-in. Creates the profile from token claims the first
/// time; afterwards refreshes identity fields and `lastLoginAt`.
pub async fn record_login(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<UserProfile, AppError> {
    let now = Utc::now();

    let Some(existing) = load_profile(store, &principal.uid).await? else {
        let mut profile = UserProfile {
            uid: principal.uid.clone(),
            email: principal.email.clone(),
            display_name: principal.display_name.clone(),
            photo_url: principal.photo_url.clone(),
            user_type: None,
            profile_complete: false,
            notification_preferences: NotificationPreferences::default(),
            push_token: None,
            is_admin: false,
            created_at: now,
            last_login_at: now,
        };
        profile.profile_complete = profile.compute_complete();
        set_record(store, Collection::Users, &principal.uid, &profile).await?;
        info!("Created profile for {}", principal.uid);
        return Ok(profile);
    };

    let mut profile = existing.data;
    let mut fields = Map::new();
    profile.last_login_at = now;
    fields.insert("lastLoginAt".into(), serde_json::to_value(now)?);
    profile.email = principal.email.clone();
    fields.insert("email".into(), Value::String(profile.email.clone()));
    if profile.display_name.is_none() && principal.display_name.is_some() {
        profile.display_name = principal.display_name.clone();
        fields.insert("displayName".into(), json!(profile.display_name));
    }
    if profile.photo_url.is_none() && principal.photo_url.is_some() {
        profile.photo_url = principal.photo_url.clone();
        fields.insert("photoUrl".into(), json!(profile.photo_url));
    }
    let complete = profile.compute_complete();
    if complete != profile.profile_complete {
        profile.profile_complete = complete;
        fields.insert("profileComplete".into(), Value::Bool(complete));
    }

    let mut batch = WriteBatch::new();
    batch.merge(Collection::Users, &principal.uid, Value::Object(fields));
    store.commit(batch).await?;
    Ok(profile)
}

pub async fn get_profile(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<UserProfile, AppError> {
    load_profile(store, &principal.uid)
        .await?
        .map(|r| r.data)
        .ok_or_else(|| AppError::NotFound("Profile not found; sign in first".into()))
}

pub async fn update_profile(
    store: &dyn DocumentStore,
    principal: &Principal,
    update: ProfileUpdate,
) -> Result<UserProfile, AppError> {
    let mut profile = get_profile(store, principal).await?;

    if let Some(name) = update.display_name {
        let name = name.trim().to_string();
        profile.display_name = (!name.is_empty()).then_some(name);
    }
    if let Some(photo) = update.photo_url {
        profile.photo_url = (!photo.trim().is_empty()).then(|| photo.trim().to_string());
    }
    if let Some(user_type) = update.user_type {
        profile.user_type = Some(user_type);
    }
    if let Some(prefs) = update.notification_preferences {
        profile.notification_preferences = prefs;
    }
    if let Some(token) = update.push_token {
        profile.push_token = (!token.trim().is_empty()).then(|| token.trim().to_string());
    }
    profile.profile_complete = profile.compute_complete();

    set_record(store, Collection::Users, &principal.uid, &profile).await?;
    Ok(profile)
}

/// Admin rights come from the token's `admin` claim or the stored profile flag.
pub async fn require_admin(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<(), AppError> {
    if principal.is_admin {
        return Ok(());
    }
    match load_profile(store, &principal.uid).await? {
        Some(profile) if profile.data.is_admin => Ok(()),
        _ => Err(AppError::Forbidden("Admin privileges required".into())),
    }
}

pub async fn set_admin(
    store: &dyn DocumentStore,
    principal: &Principal,
    uid: &str,
    is_admin: bool,
) -> Result<UserProfile, AppError> {
    require_admin(store, principal).await?;
    let mut target = load_profile(store, uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {uid} not found")))?
        .data;

    let mut batch = WriteBatch::new();
    batch.merge(Collection::Users, uid, json!({"isAdmin": is_admin}));
    store.commit(batch).await?;
    info!("Admin flag for {uid} set to {is_admin} by {}", principal.uid);

    target.is_admin = is_admin;
    Ok(target)
}
