use std::collections::HashMap;

use serde::Serialize;

use crate::applications::submission::get_application_record;
use crate::auth::Principal;
use crate::errors::AppError;
use crate::jobs::service::require_owned_job;
use crate::models::{Application, ApplicationStatus, Job, JobSummary};
use crate::store::{get_record, query_records, Collection, DocumentStore, Query, Record};

/// An application plus a summary of its job. The summary is a placeholder
/// when the job has been deleted.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Record<Application>,
    pub job: JobSummary,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StatusCounts {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn tally(applications: &[Record<Application>]) -> Self {
        let mut counts = Self::default();
        for app in applications {
            match app.data.status {
                ApplicationStatus::Pending => counts.pending += 1,
                ApplicationStatus::Accepted => counts.accepted += 1,
                ApplicationStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobApplicants {
    pub job: Record<Job>,
    pub applications: Vec<Record<Application>>,
    pub counts: StatusCounts,
}

async fn job_summary(
    store: &dyn DocumentStore,
    job_id: &str,
) -> Result<(JobSummary, Option<Record<Job>>), AppError> {
    let job: Option<Record<Job>> = get_record(store, Collection::Jobs, job_id).await?;
    let summary = match &job {
        Some(job) => JobSummary::from_job(&job.id, &job.data),
        None => JobSummary::placeholder(job_id),
    };
    Ok((summary, job))
}

/// Visible to the applicant and to the job owner.
pub async fn get_application(
    store: &dyn DocumentStore,
    principal: &Principal,
    id: &str,
) -> Result<ApplicationView, AppError> {
    let application = get_application_record(store, id).await?;
    let (summary, job) = job_summary(store, &application.data.job_id).await?;

    let is_applicant = application.data.user_id == principal.uid;
    let is_owner = match &job {
        Some(job) => job.data.user_id == principal.uid,
        None => application.data.posted_by(&principal.email),
    };
    if !is_applicant && !is_owner {
        return Err(AppError::Forbidden(
            "You do not have access to this application".into(),
        ));
    }

    Ok(ApplicationView {
        application,
        job: summary,
    })
}

/// The principal's own applications, newest first.
pub async fn list_my_applications(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<Vec<ApplicationView>, AppError> {
    let query = Query::new(Collection::Applications).where_eq("userId", principal.uid.as_str());
    let mut applications: Vec<Record<Application>> = query_records(store, &query).await?;
    applications.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));

    let mut summaries: HashMap<String, JobSummary> = HashMap::new();
    let mut views = Vec::with_capacity(applications.len());
    for application in applications {
        let job_id = application.data.job_id.clone();
        let summary = match summaries.get(&job_id) {
            Some(summary) => summary.clone(),
            None => {
                let (summary, _) = job_summary(store, &job_id).await?;
                summaries.insert(job_id, summary.clone());
                summary
            }
        };
        views.push(ApplicationView {
            application,
            job: summary,
        });
    }
    Ok(views)
}

/// Applicants for one of the principal's jobs, newest first.
pub async fn list_job_applications(
    store: &dyn DocumentStore,
    principal: &Principal,
    job_id: &str,
) -> Result<JobApplicants, AppError> {
    let job = require_owned_job(store, principal, job_id).await?;

    let query = Query::new(Collection::Applications).where_eq("jobId", job_id);
    let mut applications: Vec<Record<Application>> = query_records(store, &query).await?;
    applications.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));
    let counts = StatusCounts::tally(&applications);

    Ok(JobApplicants {
        job,
        applications,
        counts,
    })
}
