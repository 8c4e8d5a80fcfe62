use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::time::deserialize_optional_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Approved,
    Rejected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Approved => "approved",
            JobStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSkill {
    pub skill_name: String,
    pub min_years: Option<i32>,
    #[serde(default)]
    pub is_mandatory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResponsibility {
    pub content: String,
    pub importance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalQuestion {
    pub question: String,
    #[serde(default)]
    pub desired_answer: String,
}

/// A job posting and its approval workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRole {
    pub id: Uuid,
    pub title: String,
    pub department: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub work_mode: Option<String>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub key_business_objective: Option<String>,
    pub min_experience: Option<i32>,
    #[serde(default)]
    pub is_english_required: bool,
    #[serde(default)]
    pub is_coding_required: bool,
    #[serde(default)]
    pub is_technical_required: bool,
    #[serde(default)]
    pub skills: Vec<JobSkill>,
    #[serde(default)]
    pub responsibilities: Vec<JobResponsibility>,
    #[serde(default)]
    pub technical_questions: Vec<TechnicalQuestion>,
    pub status: JobStatus,
    #[serde(default = "default_open")]
    pub is_open: bool,
    pub created_by: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Optimistic-locking counter, bumped by the backend on every write.
    #[serde(default = "default_version")]
    pub version: i32,
}

fn default_open() -> bool {
    true
}

fn default_version() -> i32 {
    1
}

impl JobRole {
    pub fn accepts_applications(&self) -> bool {
        self.status == JobStatus::Approved && self.is_open
    }

    pub fn compensation_range(&self) -> Option<(Decimal, Decimal)> {
        match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) => Some((min, max)),
            (Some(min), None) => Some((min, min)),
            (None, Some(max)) => Some((max, max)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    pub requested_by: Option<Uuid>,
    pub reviewed_by: Option<Uuid>,
    pub status: JobStatus,
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeStats {
    pub total_jobs: i64,
    pub pending_jobs: i64,
    pub approved_jobs: i64,
    pub rejected_jobs: i64,
    pub closed_jobs: i64,
}
