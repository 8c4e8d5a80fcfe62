use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::time::deserialize_optional_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Submitted,
    Reviewing,
    Shortlisted,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
        }
    }

    /// Statuses HR may set; `submitted` is only ever assigned on apply.
    pub fn is_review_decision(&self) -> bool {
        !matches!(self, ApplicationStatus::Submitted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawJobApplication")]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub feedback: Option<String>,
    pub job_title: Option<String>,
    pub applicant_name: Option<String>,
    pub applicant_email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Derived on the client from technical assessment rows.
    pub technical_completed: bool,
}

#[derive(Deserialize)]
struct EmbeddedJob {
    title: Option<String>,
}

/// Wire shape: the list endpoint embeds `job_roles: { title }` next to a flat
/// `job_title`, and names the applicant `candidate_*`.
#[derive(Deserialize)]
struct RawJobApplication {
    id: Uuid,
    job_id: Uuid,
    applicant_id: Uuid,
    status: ApplicationStatus,
    #[serde(default)]
    cover_letter: Option<String>,
    #[serde(default)]
    resume_url: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    job_title: Option<String>,
    #[serde(default)]
    job_roles: Option<EmbeddedJob>,
    #[serde(default)]
    applicant_name: Option<String>,
    #[serde(default)]
    applicant_email: Option<String>,
    #[serde(default)]
    candidate_name: Option<String>,
    #[serde(default)]
    candidate_email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    technical_completed: bool,
}

impl From<RawJobApplication> for JobApplication {
    fn from(raw: RawJobApplication) -> Self {
        Self {
            id: raw.id,
            job_id: raw.job_id,
            applicant_id: raw.applicant_id,
            status: raw.status,
            cover_letter: raw.cover_letter,
            resume_url: raw.resume_url,
            phone: raw.phone,
            linkedin_url: raw.linkedin_url,
            feedback: raw.feedback,
            job_title: raw
                .job_title
                .or_else(|| raw.job_roles.and_then(|job| job.title)),
            applicant_name: raw.applicant_name.or(raw.candidate_name),
            applicant_email: raw
                .applicant_email
                .or(raw.candidate_email)
                .filter(|email| !email.is_empty()),
            created_at: raw.created_at,
            technical_completed: raw.technical_completed,
        }
    }
}
