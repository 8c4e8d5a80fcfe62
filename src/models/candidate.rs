use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::time::deserialize_optional_timestamp;

/// Candidate profile; file URLs arrive already signed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub resume_url: Option<String>,
    pub profile_pic_url: Option<String>,
    pub skills: Option<String>,
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Minimal profile projection used by batched lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRef {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub url: String,
}
