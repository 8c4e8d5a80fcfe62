use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::cache::{Mutation, QueryClient, QueryKey};
use crate::dto::job_dto::{
    ApplyPayload, CreateEmployeeJobPayload, CreateJobPayload, GenerateContentPayload,
    GeneratedContent, RejectJobPayload, UpdateEmployeeJobPayload, UpdateJobPayload,
};
use crate::error::{Error, Result};
use crate::models::application::JobApplication;
use crate::models::job_role::{ApprovalRecord, EmployeeStats, JobRole};
use crate::services::api_client::ApiClient;

/// Job postings: listing, the approval workflow and the employee surface.
#[derive(Clone)]
pub struct JobService {
    api: ApiClient,
    queries: QueryClient,
}

impl JobService {
    pub fn new(api: ApiClient, queries: QueryClient) -> Self {
        Self { api, queries }
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobRole>> {
        self.queries
            .fetch(QueryKey::jobs(), || self.api.get("/api/jobs"))
            .await
    }

    pub async fn pending_jobs(&self) -> Result<Vec<JobRole>> {
        self.queries
            .fetch(QueryKey::pending_jobs(), || self.api.get("/api/jobs/pending"))
            .await
    }

    /// Approved, open jobs. Works without a session.
    pub async fn public_jobs(&self) -> Result<Vec<JobRole>> {
        self.queries
            .fetch(QueryKey::public_jobs(), || {
                self.api.get_public("/api/jobs/public")
            })
            .await
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<JobRole> {
        let path = format!("/api/jobs/{}", job_id);
        self.queries
            .fetch(QueryKey::job(job_id), || self.api.get(&path))
            .await
    }

    pub async fn job_applications(&self, job_id: Uuid) -> Result<Vec<JobApplication>> {
        let path = format!("/api/jobs/{}/applications", job_id);
        self.queries
            .fetch(QueryKey::job_applications(job_id), || self.api.get(&path))
            .await
    }

    pub async fn approval_history(&self, job_id: Uuid) -> Result<Vec<ApprovalRecord>> {
        let path = format!("/api/jobs/{}/approvals", job_id);
        self.queries
            .fetch(QueryKey::job_approvals(job_id), || self.api.get(&path))
            .await
    }

    pub async fn create_job(&self, payload: CreateJobPayload) -> Result<JobRole> {
        payload.validate()?;
        let job: JobRole = self
            .queries
            .mutate(Mutation::CreateJob, self.api.post("/api/jobs", &payload))
            .await?;
        info!(job_id = %job.id, title = %job.title, "Job created");
        Ok(job)
    }

    /// Sends `current_version` when set; a stale version comes back as
    /// [`Error::VersionConflict`] and the cached detail is dropped so the
    /// next read shows the other user's edit.
    pub async fn update_job(&self, job_id: Uuid, payload: UpdateJobPayload) -> Result<JobRole> {
        payload.validate()?;
        let path = format!("/api/jobs/{}", job_id);
        let result = self
            .queries
            .mutate(
                Mutation::UpdateJob { job_id },
                self.api.patch_versioned(&path, &payload, job_id),
            )
            .await;
        self.on_conflict(job_id, result)
    }

    fn on_conflict<T>(&self, job_id: Uuid, result: Result<T>) -> Result<T> {
        if let Err(Error::VersionConflict { .. }) = &result {
            warn!(%job_id, "Job update rejected: stale version");
            self.queries.invalidate(&QueryKey::job(job_id));
            self.queries.invalidate(&QueryKey::employee_job(job_id));
        }
        result
    }

    pub async fn delete_job(&self, job_id: Uuid) -> Result<()> {
        let path = format!("/api/jobs/{}", job_id);
        self.queries
            .mutate(Mutation::DeleteJob { job_id }, self.api.delete::<()>(&path))
            .await?;
        info!(%job_id, "Job deleted");
        Ok(())
    }

    pub async fn approve_job(&self, job_id: Uuid) -> Result<JsonValue> {
        let path = format!("/api/jobs/{}/approve", job_id);
        self.queries
            .mutate(
                Mutation::ApproveJob { job_id },
                self.api.patch(&path, &serde_json::json!({})),
            )
            .await
    }

    pub async fn reject_job(&self, job_id: Uuid, reason: impl Into<String>) -> Result<JsonValue> {
        let payload = RejectJobPayload {
            reason: reason.into(),
        };
        payload.validate()?;
        let path = format!("/api/jobs/{}/reject", job_id);
        self.queries
            .mutate(Mutation::RejectJob { job_id }, self.api.patch(&path, &payload))
            .await
    }

    pub async fn close_job(&self, job_id: Uuid) -> Result<JsonValue> {
        let path = format!("/api/jobs/{}/close", job_id);
        self.queries
            .mutate(
                Mutation::CloseJob { job_id },
                self.api.patch(&path, &serde_json::json!({})),
            )
            .await
    }

    pub async fn apply(&self, job_id: Uuid, payload: ApplyPayload) -> Result<JobApplication> {
        payload.validate()?;
        let path = format!("/api/jobs/{}/apply", job_id);
        self.queries
            .mutate(Mutation::ApplyToJob { job_id }, self.api.post(&path, &payload))
            .await
    }

    pub async fn create_employee_job(&self, payload: CreateEmployeeJobPayload) -> Result<JobRole> {
        payload.validate()?;
        self.queries
            .mutate(
                Mutation::CreateEmployeeJob,
                self.api.post("/api/employee/jobs", &payload),
            )
            .await
    }

    /// One of the employee's jobs with its skills, responsibilities and
    /// technical questions filled in.
    pub async fn employee_job(&self, job_id: Uuid) -> Result<JobRole> {
        let path = format!("/api/employee/jobs/{}", job_id);
        self.queries
            .fetch(QueryKey::employee_job(job_id), || self.api.get(&path))
            .await
    }

    pub async fn update_employee_job(
        &self,
        job_id: Uuid,
        payload: UpdateEmployeeJobPayload,
    ) -> Result<JobRole> {
        payload.validate()?;
        let path = format!("/api/employee/jobs/{}", job_id);
        let result = self
            .queries
            .mutate(
                Mutation::UpdateEmployeeJob { job_id },
                self.api.patch_versioned(&path, &payload, job_id),
            )
            .await;
        self.on_conflict(job_id, result)
    }

    pub async fn my_jobs(&self) -> Result<Vec<JobRole>> {
        self.queries
            .fetch(QueryKey::employee_jobs(), || self.api.get("/api/employee/jobs"))
            .await
    }

    pub async fn employee_stats(&self) -> Result<EmployeeStats> {
        self.queries
            .fetch(QueryKey::employee_stats(), || {
                self.api.get("/api/employee/stats")
            })
            .await
    }

    /// Drafting help for a job field. Not cached: every call is a new draft.
    pub async fn generate_content(
        &self,
        payload: GenerateContentPayload,
    ) -> Result<GeneratedContent> {
        payload.validate()?;
        self.api.post("/api/employee/ai/generate", &payload).await
    }
}
