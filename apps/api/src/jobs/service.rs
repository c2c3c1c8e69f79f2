use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::auth::Principal;
use crate::errors::{AppError, FieldErrors};
use crate::models::{Job, JobType};
use crate::store::{
    get_record, new_id, query_records, set_record, Collection, DocumentStore, Query, Record,
    WriteBatch,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub salary: String,
    pub description: String,
    pub job_type: String,
    #[serde(default)]
    pub category: String,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    pub category: Option<String>,
    pub job_type: Option<String>,
    /// Case-insensitive substring of title, company or description.
    pub q: Option<String>,
}

fn parse_job_type(raw: &str) -> Option<JobType> {
    serde_json::from_value(Value::String(raw.trim().to_lowercase())).ok()
}

fn require_text(errors: &mut FieldErrors, field: &str, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), format!("{label} is required"));
    }
}

fn validate_job_input(input: &JobInput) -> Result<JobType, AppError> {
    let mut errors = FieldErrors::new();
    require_text(&mut errors, "title", "Title", &input.title);
    require_text(&mut errors, "company", "Company", &input.company);
    require_text(&mut errors, "location", "Location", &input.location);
    require_text(&mut errors, "description", "Description", &input.description);
    let job_type = parse_job_type(&input.job_type);
    if job_type.is_none() {
        errors.insert(
            "jobType".into(),
            "Job type must be one of full-time, part-time, contract, internship".into(),
        );
    }
    match job_type {
        Some(job_type) if errors.is_empty() => Ok(job_type),
        _ => Err(AppError::InvalidFields(errors)),
    }
}

pub async fn create_job(
    store: &dyn DocumentStore,
    principal: &Principal,
    input: JobInput,
) -> Result<Record<Job>, AppError> {
    let job_type = validate_job_input(&input)?;

    let job = Job {
        title: input.title.trim().to_string(),
        company: input.company.trim().to_string(),
        location: input.location.trim().to_string(),
        salary: input.salary.trim().to_string(),
        description: input.description,
        job_type,
        category: input.category.trim().to_string(),
        user_id: principal.uid.clone(),
        posted_by_email: Some(principal.email.trim().to_string()).filter(|e| !e.is_empty()),
        created_at: Utc::now(),
        updated_at: None,
    };
    let id = new_id();
    set_record(store, Collection::Jobs, &id, &job).await?;
    info!("Created job {id} for owner {}", principal.uid);

    Ok(Record { id, data: job })
}

pub async fn get_job(store: &dyn DocumentStore, id: &str) -> Result<Record<Job>, AppError> {
    get_record(store, Collection::Jobs, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// Loads a job and checks that the principal owns it.
pub async fn require_owned_job(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
) -> Result<Record<Job>, AppError> {
    let job = get_job(store, id).await?;
    if job.data.user_id != principal.uid {
        return Err(AppError::Forbidden(
            "Only the job owner can modify this job".into(),
        ));
    }
    Ok(job)
}

/// Public listing, newest first.
pub async fn list_jobs(
    store: &dyn DocumentStore,
    filter: &JobFilter,
) -> Result<Vec<Record<Job>>, AppError> {
    let mut query = Query::new(Collection::Jobs);
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        query = query.where_eq("category", category);
    }
    if let Some(raw) = filter.job_type.as_deref().filter(|t| !t.is_empty()) {
        let job_type = parse_job_type(raw)
            .ok_or_else(|| AppError::Validation(format!("Unknown job type '{raw}'")))?;
        query = query.where_eq("jobType", job_type.as_str());
    }

    let mut jobs: Vec<Record<Job>> = query_records(store, &query).await?;
    if let Some(needle) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let needle = needle.to_lowercase();
        jobs.retain(|j| {
            j.data.title.to_lowercase().contains(&needle)
                || j.data.company.to_lowercase().contains(&needle)
                || j.data.description.to_lowercase().contains(&needle)
        });
    }
    jobs.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));
    Ok(jobs)
}

pub async fn list_owned_jobs(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<Vec<Record<Job>>, AppError> {
    let query = Query::new(Collection::Jobs).where_eq("userId", principal.uid.as_str());
    let mut jobs: Vec<Record<Job>> = query_records(store, &query).await?;
    jobs.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));
    Ok(jobs)
}

pub async fn update_job(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
    patch: JobPatch,
) -> Result<Record<Job>, AppError> {
    let mut job = require_owned_job(store, principal, id).await?;

    let mut errors = FieldErrors::new();
    let mut fields = Map::new();
    for (field, label, value, target) in [
        ("title", "Title", patch.title, &mut job.data.title),
        ("company", "Company", patch.company, &mut job.data.company),
        ("location", "Location", patch.location, &mut job.data.location),
        ("description", "Description", patch.description, &mut job.data.description),
    ] {
        if let Some(value) = value {
            require_text(&mut errors, field, label, &value);
            *target = value.trim().to_string();
            fields.insert(field.to_string(), Value::String(target.clone()));
        }
    }
    if let Some(salary) = patch.salary {
        job.data.salary = salary.trim().to_string();
        fields.insert("salary".into(), Value::String(job.data.salary.clone()));
    }
    if let Some(category) = patch.category {
        job.data.category = category.trim().to_string();
        fields.insert("category".into(), Value::String(job.data.category.clone()));
    }
    if let Some(raw) = patch.job_type {
        match parse_job_type(&raw) {
            Some(job_type) => {
                job.data.job_type = job_type;
                fields.insert("jobType".into(), Value::String(job_type.as_str().into()));
            }
            None => {
                errors.insert(
                    "jobType".into(),
                    "Job type must be one of full-time, part-time, contract, internship".into(),
                );
            }
        }
    }
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }

    let now = Utc::now();
    job.data.updated_at = Some(now);
    fields.insert("updatedAt".into(), serde_json::to_value(now)?);

    let mut batch = WriteBatch::new();
    batch.merge(Collection::Jobs, id, Value::Object(fields));
    store.commit(batch).await?;
    info!("Updated job {id}");

    Ok(job)
}

/// Deletes the job only. Applications and notifications that reference it
/// are left in place and rendered with a placeholder on read.
pub async fn delete_job(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
) -> Result<(), AppError> {
    require_owned_job(store, principal, id).await?;

    let mut batch = WriteBatch::new();
    batch.delete(Collection::Jobs, id);
    store.commit(batch).await?;
    info!("Deleted job {id}");
    Ok(())
}
