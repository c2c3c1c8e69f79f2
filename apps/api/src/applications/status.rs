use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::applications::submission::get_application_record;
use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::{Application, ApplicationStatus, Job, Notification, NotificationKind};
use crate::store::{get_record, new_id, Collection, DocumentStore, Record, WriteBatch};

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: ApplicationStatus,
    /// Required to flip directly between `accepted` and `rejected`.
    #[serde(default)]
    pub confirm: bool,
}

/// A timestamp strictly after `previous`, even when the clock has not advanced.
pub fn next_stamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::nanoseconds(1),
        _ => now,
    }
}

/// The job owner may write any status. When the job is gone, the denormalised
/// `jobPosterEmail` on the application stands in for the owner.
fn authorize_status_change(
    principal: &Principal,
    application: &Application,
    job: Option<&Record<Job>>,
) -> Result<(), AppError> {
    let allowed = match job {
        Some(job) => job.data.user_id == principal.uid,
        None => application.posted_by(&principal.email),
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the job owner can update application status".into(),
        ))
    }
}

fn status_message(application: &Application, status: ApplicationStatus) -> String {
    let job = if application.job_title.is_empty() {
        "a job".to_string()
    } else if application.company.is_empty() {
        application.job_title.clone()
    } else {
        format!("{} at {}", application.job_title, application.company)
    };
    match status {
        ApplicationStatus::Pending => format!("Your application for {job} is back under review"),
        ApplicationStatus::Accepted => format!("Your application for {job} was accepted"),
        ApplicationStatus::Rejected => format!("Your application for {job} was rejected"),
    }
}

/// Writes a new status for an application.
///
/// No transition is forbidden and there is no terminal state. Flipping between
/// `accepted` and `rejected` needs `confirm`. The status write and the
/// applicant's `status_update` notification commit together.
pub async fn change_status(
    store: &dyn DocumentStore,
    principal: &Principal,
    application_id: &str,
    change: StatusChange,
) -> Result<Record<Application>, AppError> {
    let mut application = get_application_record(store, application_id).await?;
    let job: Option<Record<Job>> =
        get_record(store, Collection::Jobs, &application.data.job_id).await?;

    authorize_status_change(principal, &application.data, job.as_ref())?;

    let current = application.data.status;
    let flips_decision =
        current.is_decided() && change.status.is_decided() && current != change.status;
    if flips_decision && !change.confirm {
        return Err(AppError::Conflict {
            code: "CONFIRMATION_REQUIRED",
            message: format!(
                "Changing an application from {current} to {} must be confirmed",
                change.status
            ),
        });
    }

    let stamp = next_stamp(application.data.status_updated_at);
    application.data.status = change.status;
    application.data.status_updated_at = Some(stamp);

    let notification = Notification {
        user_id: application.data.user_id.clone(),
        message: status_message(&application.data, change.status),
        kind: NotificationKind::StatusUpdate,
        application_id: Some(application.id.clone()),
        job_id: Some(application.data.job_id.clone()),
        read: false,
        created_at: stamp,
    };

    let mut batch = WriteBatch::new();
    batch.merge(
        Collection::Applications,
        application_id,
        json!({
            "status": change.status,
            "statusUpdatedAt": stamp,
        }),
    );
    batch.set(Collection::Notifications, &new_id(), &notification)?;
    store.commit(batch).await?;

    info!(
        "Application {application_id} status {current} -> {} by {}",
        change.status, principal.uid
    );
    Ok(application)
}
