use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::time::deserialize_optional_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechnicalStatus {
    Pending,
    Completed,
}

/// One technical answer row, flattened out of the embedded application/job join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTechnicalResponseRow")]
pub struct TechnicalResponseRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub applicant_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub audio_url: Option<String>,
    pub score: Option<f64>,
    pub reasoning: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// PostgREST returns a to-one embed as an object, but older views as a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.into_iter().next(),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddedJobTitle {
    title: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddedApplication {
    applicant_id: Option<Uuid>,
    #[serde(default)]
    job_roles: Option<OneOrMany<EmbeddedJobTitle>>,
}

/// Wire shape: `*,job_applications(applicant_id,job_roles(title))` from
/// PostgREST, or the already flat form written back by the cache.
#[derive(Deserialize)]
struct RawTechnicalResponseRow {
    id: Uuid,
    application_id: Uuid,
    #[serde(default)]
    applicant_id: Option<Uuid>,
    #[serde(default)]
    job_title: Option<String>,
    #[serde(default)]
    job_applications: Option<OneOrMany<EmbeddedApplication>>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    created_at: Option<DateTime<Utc>>,
}

impl From<RawTechnicalResponseRow> for TechnicalResponseRow {
    fn from(raw: RawTechnicalResponseRow) -> Self {
        let application = raw.job_applications.and_then(OneOrMany::into_first);
        let (embedded_applicant, embedded_title) = match application {
            Some(app) => (
                app.applicant_id,
                app.job_roles
                    .and_then(OneOrMany::into_first)
                    .and_then(|job| job.title),
            ),
            None => (None, None),
        };
        Self {
            id: raw.id,
            application_id: raw.application_id,
            applicant_id: raw.applicant_id.or(embedded_applicant),
            job_title: raw.job_title.or(embedded_title),
            question: raw.question,
            answer: raw.answer,
            audio_url: raw.audio_url,
            score: raw.score,
            reasoning: raw.reasoning,
            created_at: raw.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalResultGroup {
    pub application_id: Uuid,
    pub applicant_id: Option<Uuid>,
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
    pub job_title: Option<String>,
    pub responses: Vec<TechnicalResponseRow>,
    pub average_score: f64,
    pub status: TechnicalStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(embed: serde_json::Value) -> TechnicalResponseRow {
        serde_json::from_value(json!({
            "id": "5d7c1a7e-0000-4000-8000-000000000001",
            "application_id": "5d7c1a7e-0000-4000-8000-0000000000a1",
            "question": "Explain ownership",
            "answer": "Every value has one owner",
            "score": 7.0,
            "created_at": "2025-04-02T08:30:00+00:00",
            "job_applications": embed,
        }))
        .unwrap()
    }

    #[test]
    fn flattens_embedded_application_and_job() {
        let flat = row(json!({
            "applicant_id": "5d7c1a7e-0000-4000-8000-0000000000c1",
            "job_roles": { "title": "Backend Engineer" }
        }));
        assert_eq!(
            flat.applicant_id.map(|id| id.to_string()).as_deref(),
            Some("5d7c1a7e-0000-4000-8000-0000000000c1")
        );
        assert_eq!(flat.job_title.as_deref(), Some("Backend Engineer"));

        let listed = row(json!([{
            "applicant_id": "5d7c1a7e-0000-4000-8000-0000000000c1",
            "job_roles": [{ "title": "Backend Engineer" }]
        }]));
        assert_eq!(listed, flat);
    }

    #[test]
    fn missing_join_leaves_fields_empty_and_cached_form_reads_back() {
        let bare = row(serde_json::Value::Null);
        assert_eq!(bare.applicant_id, None);
        assert_eq!(bare.job_title, None);

        let embedded = row(json!({
            "applicant_id": "5d7c1a7e-0000-4000-8000-0000000000c1",
            "job_roles": null
        }));
        let cached: TechnicalResponseRow =
            serde_json::from_value(serde_json::to_value(&embedded).unwrap()).unwrap();
        assert_eq!(cached, embedded);
    }
}
