use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::user::UserProfile;
use crate::utils::time::deserialize_optional_timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub user_email: String,
    pub status: String,
    pub overall_score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One spoken answer with its AI score breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub id: Uuid,
    pub question: Option<String>,
    pub transcript: Option<String>,
    pub audio_url: Option<String>,
    pub score: Option<f64>,
    pub reasoning: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub breakdown: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDetail {
    pub id: Uuid,
    pub profile: UserProfile,
    pub scores: Option<JsonValue>,
    #[serde(default)]
    pub responses: Vec<AssessmentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioLink {
    pub url: String,
}
