use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::utils::time::deserialize_optional_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Candidate,
    Employee,
    Hr,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Candidate => "candidate",
            UserRole::Employee => "employee",
            UserRole::Hr => "hr",
            UserRole::Admin => "admin",
        }
    }

    pub fn can_review(&self) -> bool {
        matches!(self, UserRole::Hr | UserRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersPage {
    #[serde(alias = "users", alias = "data")]
    pub items: Vec<UserProfile>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl UsersPage {
    pub fn total_pages(&self) -> u32 {
        if self.limit == 0 {
            return 0;
        }
        ((self.total.max(0) as u64 + self.limit as u64 - 1) / self.limit as u64) as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_candidates: i64,
    pub total_employees: i64,
    pub total_assessments: i64,
    pub assessments_today: i64,
    pub average_score: f64,
    #[serde(default)]
    pub score_distribution: Vec<JsonValue>,
}
