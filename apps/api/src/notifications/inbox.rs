use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::{Application, ApplicationStatus, Notification};
use crate::store::{
    get_record, query_records, Collection, DocumentStore, Query, Record, StoreError, WriteBatch,
};

/// A notification decorated with the live status of the application it refers to.
/// `application_status` is `None` when there is no reference or the application is gone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxItem {
    #[serde(flatten)]
    pub notification: Record<Notification>,
    pub application_status: Option<ApplicationStatus>,
}

async fn notifications_for(
    store: &dyn DocumentStore,
    uid: &str,
    unread_only: bool,
) -> Result<Vec<Record<Notification>>, AppError> {
    let mut query = Query::new(Collection::Notifications).where_eq("userId", uid);
    if unread_only {
        query = query.where_eq("read", false);
    }
    Ok(query_records(store, &query).await?)
}

/// All notifications addressed to the principal, newest first.
/// Each referenced application is fetched at most once per listing.
pub async fn list_inbox(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<Vec<InboxItem>, AppError> {
    let mut notifications = notifications_for(store, &principal.uid, false).await?;
    notifications.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));

    let mut statuses: HashMap<String, Option<ApplicationStatus>> = HashMap::new();
    let mut items = Vec::with_capacity(notifications.len());
    for notification in notifications {
        let application_status = match notification.data.application_id.clone() {
            Some(app_id) => match statuses.get(&app_id) {
                Some(cached) => *cached,
                None => {
                    let app: Option<Record<Application>> =
                        get_record(store, Collection::Applications, &app_id).await?;
                    let status = app.map(|a| a.data.status);
                    statuses.insert(app_id, status);
                    status
                }
            },
            None => None,
        };
        items.push(InboxItem {
            notification,
            application_status,
        });
    }
    Ok(items)
}

pub async fn unread_count(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<usize, AppError> {
    Ok(notifications_for(store, &principal.uid, true).await?.len())
}

/// Loads a notification and checks that the principal is its recipient.
async fn require_recipient(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
) -> Result<Record<Notification>, AppError> {
    let notification: Record<Notification> = get_record(store, Collection::Notifications, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {id} not found")))?;
    if notification.data.user_id != principal.uid {
        return Err(AppError::Forbidden(
            "Only the recipient can modify this notification".into(),
        ));
    }
    Ok(notification)
}

pub async fn mark_read(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
) -> Result<(), AppError> {
    let notification = require_recipient(store, principal, id).await?;
    if notification.data.read {
        return Ok(());
    }
    let mut batch = WriteBatch::new();
    batch.merge(Collection::Notifications, id, json!({"read": true}));
    match store.commit(batch).await {
        Ok(()) => Ok(()),
        Err(StoreError::Missing { .. }) => {
            Err(AppError::NotFound(format!("Notification {id} not found")))
        }
        Err(e) => Err(e.into()),
    }
}

/// Attempts before giving up when notifications vanish between read and commit.
const MARK_ALL_ATTEMPTS: usize = 3;

/// Marks every unread notification read in one batch. Already-read
/// notifications are not written. Returns how many were updated.
///
/// A notification deleted concurrently fails the merge; the unread set is
/// then re-read and the batch rebuilt.
pub async fn mark_all_read(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<usize, AppError> {
    for attempt in 1..=MARK_ALL_ATTEMPTS {
        let unread = notifications_for(store, &principal.uid, true).await?;
        if unread.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for notification in &unread {
            batch.merge(
                Collection::Notifications,
                &notification.id,
                json!({"read": true}),
            );
        }
        match store.commit(batch).await {
            Ok(()) => {
                info!(
                    "Marked {} notifications read for {}",
                    unread.len(),
                    principal.uid
                );
                return Ok(unread.len());
            }
            Err(StoreError::Missing { id, .. }) => {
                warn!(
                    "Notification {id} vanished while marking all read for {} (attempt {attempt})",
                    principal.uid
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict {
        code: "CONCURRENT_MODIFICATION",
        message: "Notifications changed while marking them read; try again".into(),
    })
}

pub async fn delete_notification(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
) -> Result<(), AppError> {
    require_recipient(store, principal, id).await?;
    let mut batch = WriteBatch::new();
    batch.delete(Collection::Notifications, id);
    store.commit(batch).await?;
    Ok(())
}

/// Deletes all of the principal's notifications in one batch. Returns how many.
pub async fn delete_all(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<usize, AppError> {
    let all = notifications_for(store, &principal.uid, false).await?;
    if all.is_empty() {
        return Ok(0);
    }
    let mut batch = WriteBatch::new();
    for notification in &all {
        batch.delete(Collection::Notifications, &notification.id);
    }
    store.commit(batch).await?;
    info!("Deleted {} notifications for {}", all.len(), principal.uid);
    Ok(all.len())
}
