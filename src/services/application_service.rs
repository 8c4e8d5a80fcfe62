use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::cache::{Mutation, QueryClient, QueryKey};
use crate::dto::application_dto::ApplicationStatusUpdate;
use crate::error::Result;
use crate::models::application::{ApplicationStatus, JobApplication};
use crate::services::api_client::ApiClient;
use crate::services::data_client::{in_filter, DataClient};

pub const TECHNICAL_RESPONSES_TABLE: &str = "technical_assessment_responses";
pub const APPLICATIONS_TABLE: &str = "job_applications";

#[derive(Debug, Deserialize)]
struct ScoreRow {
    application_id: Uuid,
    score: Option<f64>,
}

#[derive(Clone)]
pub struct ApplicationService {
    api: ApiClient,
    data: DataClient,
    queries: QueryClient,
}

impl ApplicationService {
    pub fn new(api: ApiClient, data: DataClient, queries: QueryClient) -> Self {
        Self { api, data, queries }
    }

    /// Every application (HR/admin), flagged with whether the candidate has
    /// finished the technical round.
    pub async fn all_applications(&self) -> Result<Vec<JobApplication>> {
        self.queries
            .fetch(QueryKey::applications(), || self.load_all_applications())
            .await
    }

    pub async fn my_applications(&self) -> Result<Vec<JobApplication>> {
        self.queries
            .fetch(QueryKey::my_applications(), || {
                self.api.get("/api/applications/me")
            })
            .await
    }

    pub async fn update_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
        feedback: Option<String>,
    ) -> Result<JobApplication> {
        let update = ApplicationStatusUpdate { status, feedback };
        update.validate()?;
        let path = format!("/api/applications/{}/status", application_id);
        let application: JobApplication = self
            .queries
            .mutate(
                Mutation::UpdateApplicationStatus { application_id },
                self.api.put(&path, &update),
            )
            .await?;
        info!(%application_id, status = status.as_str(), "Application status updated");
        Ok(application)
    }

    /// The REST backend has no delete route; the row goes through PostgREST.
    pub async fn delete(&self, application_id: Uuid) -> Result<()> {
        self.queries
            .mutate(
                Mutation::DeleteApplication { application_id },
                self.data.delete_by_id(APPLICATIONS_TABLE, application_id),
            )
            .await?;
        info!(%application_id, "Application deleted");
        Ok(())
    }

    async fn load_all_applications(&self) -> Result<Vec<JobApplication>> {
        let mut applications: Vec<JobApplication> = self.api.get("/api/applications").await?;
        if applications.is_empty() {
            return Ok(applications);
        }

        let ids: Vec<Uuid> = applications.iter().map(|a| a.id).collect();
        let rows: Vec<ScoreRow> = self
            .data
            .select(
                TECHNICAL_RESPONSES_TABLE,
                "application_id,score",
                &[in_filter("application_id", &ids)],
            )
            .await?;

        let completion = technical_completion(&rows);
        for application in &mut applications {
            application.technical_completed =
                completion.get(&application.id).copied().unwrap_or(false);
        }
        debug!(
            applications = applications.len(),
            with_responses = completion.len(),
            "Derived technical completion"
        );
        Ok(applications)
    }
}

/// An application's technical round is complete when it has responses and
/// every one of them is scored.
fn technical_completion(rows: &[ScoreRow]) -> HashMap<Uuid, bool> {
    let mut completion = HashMap::new();
    for row in rows {
        let scored = row.score.is_some();
        completion
            .entry(row.application_id)
            .and_modify(|done: &mut bool| *done &= scored)
            .or_insert(scored);
    }
    completion
}
