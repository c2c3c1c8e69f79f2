use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Any status is reachable from any other; there is no terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Accepted and rejected are the two decided states.
    pub fn is_decided(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub job_id: String,
    /// The applicant.
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub experience: String,
    #[serde(default)]
    pub cover_letter: String,
    /// Externally hosted resume. Passed through as-is.
    pub resume_url: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub company: String,
    /// Denormalised copy of the job owner's email at submission time. May be stale.
    #[serde(default)]
    pub job_poster_email: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Application {
    /// True when `email` matches the poster recorded at submission time.
    /// A blank email on either side never matches.
    pub fn posted_by(&self, email: &str) -> bool {
        let email = email.trim();
        if email.is_empty() {
            return false;
        }
        self.job_poster_email
            .as_deref()
            .map(str::trim)
            .is_some_and(|poster| !poster.is_empty() && poster.eq_ignore_ascii_case(email))
    }
}
