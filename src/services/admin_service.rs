use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{Mutation, QueryClient, QueryKey};
use crate::dto::admin_dto::{AssessmentsQuery, RoleUpdate, UsersQuery};
use crate::error::Result;
use crate::models::assessment::{AssessmentDetail, AssessmentSummary, AudioLink};
use crate::models::user::{PlatformStats, UserProfile, UserRole, UsersPage};
use crate::services::api_client::ApiClient;
use crate::services::data_client::DataClient;

pub const PROFILES_TABLE: &str = "profiles";
pub const ASSESSMENTS_TABLE: &str = "assessments";

/// Admin dashboard. Deletes have no REST route and go through PostgREST.
#[derive(Clone)]
pub struct AdminService {
    api: ApiClient,
    data: DataClient,
    queries: QueryClient,
}

impl AdminService {
    pub fn new(api: ApiClient, data: DataClient, queries: QueryClient) -> Self {
        Self { api, data, queries }
    }

    pub async fn stats(&self) -> Result<PlatformStats> {
        self.queries
            .fetch(QueryKey::stats(), || self.api.get("/admin/stats"))
            .await
    }

    /// One page of users, cached per page, page size and search term.
    pub async fn users(&self, query: UsersQuery) -> Result<UsersPage> {
        query.validate()?;
        let key = QueryKey::users_page(query.page, query.limit, query.search.as_deref());
        self.queries
            .fetch(key, || self.api.get_with_query("/admin/users", &query))
            .await
    }

    pub async fn update_role(&self, user_id: Uuid, role: UserRole) -> Result<UserProfile> {
        let path = format!("/admin/users/{}/role", user_id);
        let profile: UserProfile = self
            .queries
            .mutate(
                Mutation::UpdateUserRole { user_id },
                self.api.patch(&path, &RoleUpdate { role }),
            )
            .await?;
        info!(%user_id, role = role.as_str(), "User role updated");
        Ok(profile)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        self.queries
            .mutate(
                Mutation::DeleteUser { user_id },
                self.data.delete_by_id(PROFILES_TABLE, user_id),
            )
            .await?;
        info!(%user_id, "User deleted");
        Ok(())
    }

    pub async fn assessments(&self, query: AssessmentsQuery) -> Result<Vec<AssessmentSummary>> {
        self.queries
            .fetch(QueryKey::assessments_page(query.limit), || {
                self.api.get_with_query("/admin/assessments", &query)
            })
            .await
    }

    pub async fn assessment(&self, assessment_id: Uuid) -> Result<AssessmentDetail> {
        let path = format!("/admin/assessments/{}", assessment_id);
        self.queries
            .fetch(QueryKey::assessment(assessment_id), || self.api.get(&path))
            .await
    }

    pub async fn delete_assessment(&self, assessment_id: Uuid) -> Result<()> {
        self.queries
            .mutate(
                Mutation::DeleteAssessment { assessment_id },
                self.data.delete_by_id(ASSESSMENTS_TABLE, assessment_id),
            )
            .await?;
        info!(%assessment_id, "Assessment deleted");
        Ok(())
    }

    /// Short-lived signed link to a response recording. Never cached.
    pub async fn audio_link(&self, assessment_id: Uuid, response_id: Uuid) -> Result<AudioLink> {
        let path = format!("/admin/assessments/{}/audio/{}", assessment_id, response_id);
        let result = self.api.get(&path).await;
        if let Err(err) = &result {
            self.api.report(err);
        }
        result
    }
}
