use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "full-time",
            JobType::PartTime => "part-time",
            JobType::Contract => "contract",
            JobType::Internship => "internship",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job posting, owned by the user who created it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub title: String,
    pub company: String,
    pub location: String,
    /// Free text, e.g. "$90k - $120k".
    #[serde(default)]
    pub salary: String,
    pub description: String,
    pub job_type: JobType,
    #[serde(default)]
    pub category: String,
    pub user_id: String,
    #[serde(default)]
    pub posted_by_email: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The job fields shown next to an application. Falls back to a placeholder
/// when the job has been deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub available: bool,
}

impl JobSummary {
    pub fn from_job(id: &str, job: &Job) -> Self {
        Self {
            id: id.to_string(),
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            available: true,
        }
    }

    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: "Job no longer available".to_string(),
            company: "Unknown company".to_string(),
            location: String::new(),
            available: false,
        }
    }
}
