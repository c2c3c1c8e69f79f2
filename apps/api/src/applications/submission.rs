use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::applications::validation::{validate_application, ApplicationForm};
use crate::auth::Principal;
use crate::errors::AppError;
use crate::jobs::service::get_job;
use crate::models::{Application, ApplicationStatus, Notification, NotificationKind};
use crate::store::{get_record, new_id, Collection, DocumentStore, Record, WriteBatch};

/// Result of a successful submit: the stored application and the id of the
/// notification sent to the job owner.
#[derive(Debug, Clone)]
pub struct Submission {
    pub application: Record<Application>,
    pub owner_id: String,
    pub notification_id: String,
}

/// Creates a `pending` application for `job_id` and a notification for the job owner.
///
/// Both documents commit in one batch: either both exist afterwards or neither does.
/// Invalid input is rejected before anything is written.
pub async fn submit_application(
    store: &dyn DocumentStore,
    principal: &Principal,
    job_id: &str,
    form: ApplicationForm,
) -> Result<Submission, AppError> {
    validate_application(&form).map_err(AppError::InvalidFields)?;

    let job = get_job(store, job_id).await?;

    let now = Utc::now();
    let application = Application {
        job_id: job.id.clone(),
        user_id: principal.uid.clone(),
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        phone: form.phone.trim().to_string(),
        experience: form.experience.trim().to_string(),
        cover_letter: form.cover_letter,
        resume_url: form.resume_url.trim().to_string(),
        status: ApplicationStatus::Pending,
        job_title: job.data.title.clone(),
        company: job.data.company.clone(),
        job_poster_email: job.data.posted_by_email.clone(),
        created_at: now,
        status_updated_at: None,
        updated_at: None,
    };
    let application_id = new_id();

    let notification = Notification {
        user_id: job.data.user_id.clone(),
        message: format!("{} applied for {}", application.name, job.data.title),
        kind: NotificationKind::Application,
        application_id: Some(application_id.clone()),
        job_id: Some(job.id.clone()),
        read: false,
        created_at: now,
    };
    let notification_id = new_id();

    let mut batch = WriteBatch::new();
    batch
        .set(Collection::Applications, &application_id, &application)?
        .set(Collection::Notifications, &notification_id, &notification)?;
    store.commit(batch).await?;

    info!(
        "Application {application_id} submitted for job {} by {}",
        job.id, principal.uid
    );

    Ok(Submission {
        application: Record {
            id: application_id,
            data: application,
        },
        owner_id: job.data.user_id,
        notification_id,
    })
}

pub async fn get_application_record(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<Record<Application>, AppError> {
    get_record(store, Collection::Applications, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// Loads an application and checks that the principal is its applicant.
async fn require_own_application(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
) -> Result<Record<Application>, AppError> {
    let application = get_application_record(store, id).await?;
    if application.data.user_id != principal.uid {
        return Err(AppError::Forbidden(
            "Only the applicant can modify this application".into(),
        ));
    }
    Ok(application)
}

/// Edits the applicant-supplied fields in place. Status, job and ownership
/// fields are never touched by this path.
pub async fn update_application(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
    form: ApplicationForm,
) -> Result<Record<Application>, AppError> {
    validate_application(&form).map_err(AppError::InvalidFields)?;
    let mut application = require_own_application(store, principal, id).await?;

    let now = Utc::now();
    let data = &mut application.data;
    data.name = form.name.trim().to_string();
    data.email = form.email.trim().to_string();
    data.phone = form.phone.trim().to_string();
    data.experience = form.experience.trim().to_string();
    data.cover_letter = form.cover_letter;
    data.resume_url = form.resume_url.trim().to_string();
    data.updated_at = Some(now);

    let mut batch = WriteBatch::new();
    batch.merge(
        Collection::Applications,
        id,
        json!({
            "name": data.name,
            "email": data.email,
            "phone": data.phone,
            "experience": data.experience,
            "coverLetter": data.cover_letter,
            "resumeUrl": data.resume_url,
            "updatedAt": now,
        }),
    );
    store.commit(batch).await?;
    info!("Application {id} updated by applicant");

    Ok(application)
}

/// Withdraws (deletes) the principal's own application.
pub async fn withdraw_application(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
) -> Result<(), AppError> {
    require_own_application(store, principal, id).await?;

    let mut batch = WriteBatch::new();
    batch.delete(Collection::Applications, id);
    store.commit(batch).await?;
    info!("Application {id} withdrawn");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::service::{create_job, delete_job};
    use crate::models::Job;
    use crate::store::{query_records, MemoryStore, Query};
    use crate::test_support::{application_form, job_input, principal};

    async fn seed_job(store: &MemoryStore) -> Record<Job> {
        create_job(store, &principal("owner"), job_input("Rust Engineer"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_creates_application_and_owner_notification() {
        let store = MemoryStore::new();
        let job = seed_job(&store).await;

        let submission =
            submit_application(&store, &principal("seeker"), &job.id, application_form())
                .await
                .unwrap();

        let apps: Vec<Record<Application>> =
            query_records(&store, &Query::new(Collection::Applications))
                .await
                .unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].id, submission.application.id);
        assert_eq!(apps[0].data.status, ApplicationStatus::Pending);
        assert_eq!(apps[0].data.user_id, "seeker");
        assert_eq!(apps[0].data.job_title, "Rust Engineer");
        assert_eq!(
            apps[0].data.job_poster_email.as_deref(),
            Some("owner@example.com")
        );

        let notes: Vec<Record<Notification>> =
            query_records(&store, &Query::new(Collection::Notifications))
                .await
                .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].data.user_id, "owner");
        assert_eq!(notes[0].data.kind, NotificationKind::Application);
        assert_eq!(
            notes[0].data.application_id.as_deref(),
            Some(submission.application.id.as_str())
        );
        assert!(!notes[0].data.read);
        assert_eq!(submission.owner_id, "owner");
    }

    #[tokio::test]
    async fn test_invalid_resume_url_writes_nothing() {
        let store = MemoryStore::new();
        let job = seed_job(&store).await;
        let writes_before = store.writes_applied();

        let mut form = application_form();
        form.resume_url = "my resume".into();
        let result = submit_application(&store, &principal("seeker"), &job.id, form).await;

        match result {
            Err(AppError::InvalidFields(errors)) => assert!(errors.contains_key("resumeUrl")),
            other => panic!("expected InvalidFields, got {other:?}"),
        }
        assert_eq!(store.count(Collection::Applications).await, 0);
        assert_eq!(store.count(Collection::Notifications).await, 0);
        assert_eq!(store.writes_applied(), writes_before);
    }

    #[tokio::test]
    async fn test_submit_for_missing_job() {
        let store = MemoryStore::new();
        let result =
            submit_application(&store, &principal("seeker"), "nope", application_form()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(store.count(Collection::Applications).await, 0);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_neither_record() {
        let store = MemoryStore::new();
        let job = seed_job(&store).await;
        store.set_unavailable(true);

        let result =
            submit_application(&store, &principal("seeker"), &job.id, application_form()).await;
        assert!(matches!(result, Err(AppError::Store(_))));

        store.set_unavailable(false);
        assert_eq!(store.count(Collection::Applications).await, 0);
        assert_eq!(store.count(Collection::Notifications).await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_applications_are_allowed() {
        let store = MemoryStore::new();
        let job = seed_job(&store).await;
        let seeker = principal("seeker");
        submit_application(&store, &seeker, &job.id, application_form())
            .await
            .unwrap();
        submit_application(&store, &seeker, &job.id, application_form())
            .await
            .unwrap();
        assert_eq!(store.count(Collection::Applications).await, 2);
    }

    #[tokio::test]
    async fn test_update_keeps_status_and_ownership() {
        let store = MemoryStore::new();
        let job = seed_job(&store).await;
        let seeker = principal("seeker");
        let submission = submit_application(&store, &seeker, &job.id, application_form())
            .await
            .unwrap();
        let id = submission.application.id;

        let mut form = application_form();
        form.experience = "Ten years".into();
        form.resume_url = "https://files.example.com/ada-v2.pdf".into();

        assert!(matches!(
            update_application(&store, &principal("other"), &id, form.clone()).await,
            Err(AppError::Forbidden(_))
        ));

        update_application(&store, &seeker, &id, form).await.unwrap();
        let stored = get_application_record(&store, &id).await.unwrap();
        assert_eq!(stored.data.experience, "Ten years");
        assert_eq!(stored.data.resume_url, "https://files.example.com/ada-v2.pdf");
        assert_eq!(stored.data.status, ApplicationStatus::Pending);
        assert_eq!(stored.data.user_id, "seeker");
        assert_eq!(stored.data.job_id, job.id);
        assert!(stored.data.updated_at.is_some());
        assert_eq!(store.count(Collection::Notifications).await, 1);
    }

    #[tokio::test]
    async fn test_withdraw_only_by_applicant() {
        let store = MemoryStore::new();
        let job = seed_job(&store).await;
        let seeker = principal("seeker");
        let id = submit_application(&store, &seeker, &job.id, application_form())
            .await
            .unwrap()
            .application
            .id;

        assert!(matches!(
            withdraw_application(&store, &principal("owner"), &id).await,
            Err(AppError::Forbidden(_))
        ));
        withdraw_application(&store, &seeker, &id).await.unwrap();
        assert_eq!(store.count(Collection::Applications).await, 0);
    }

    #[tokio::test]
    async fn test_deleting_job_orphans_dependents() {
        let store = MemoryStore::new();
        let job = seed_job(&store).await;
        submit_application(&store, &principal("seeker"), &job.id, application_form())
            .await
            .unwrap();

        delete_job(&store, &principal("owner"), &job.id).await.unwrap();

        assert_eq!(store.count(Collection::Jobs).await, 0);
        assert_eq!(store.count(Collection::Applications).await, 1);
        assert_eq!(store.count(Collection::Notifications).await, 1);
    }
}
