use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::{QueryClient, QueryKey};
use crate::error::Result;
use crate::models::candidate::CandidateRef;
use crate::models::technical::{TechnicalResponseRow, TechnicalResultGroup, TechnicalStatus};
use crate::services::application_service::TECHNICAL_RESPONSES_TABLE;
use crate::services::data_client::{eq_filter, in_filter, limit, order_desc, DataClient};

pub const CANDIDATE_PROFILES_TABLE: &str = "candidate_profiles";

/// Response columns plus the applicant and job title through the application.
pub const TECHNICAL_ROW_COLUMNS: &str = "*,job_applications(applicant_id,job_roles(title))";

/// Technical-interview results grouped per application.
#[derive(Clone)]
pub struct TechnicalService {
    data: DataClient,
    queries: QueryClient,
    results_limit: usize,
}

impl TechnicalService {
    pub fn new(data: DataClient, queries: QueryClient, results_limit: usize) -> Self {
        Self {
            data,
            queries,
            results_limit,
        }
    }

    /// Results for one application, or the newest rows across all of them.
    pub async fn results(&self, application_id: Option<Uuid>) -> Result<Vec<TechnicalResultGroup>> {
        self.queries
            .fetch(QueryKey::technical_results(application_id), || {
                self.load(application_id)
            })
            .await
    }

    async fn load(&self, application_id: Option<Uuid>) -> Result<Vec<TechnicalResultGroup>> {
        let mut filters = vec![order_desc("created_at")];
        match application_id {
            Some(id) => filters.push(eq_filter("application_id", id)),
            None => filters.push(limit(self.results_limit)),
        }
        let rows: Vec<TechnicalResponseRow> = self
            .data
            .select(TECHNICAL_RESPONSES_TABLE, TECHNICAL_ROW_COLUMNS, &filters)
            .await?;

        let candidates = self.lookup_candidates(&rows).await?;
        let groups = group_results(rows, &candidates);
        info!(
            groups = groups.len(),
            application_id = ?application_id,
            "Technical results loaded"
        );
        Ok(groups)
    }

    /// One batched lookup for every applicant referenced by `rows`.
    async fn lookup_candidates(
        &self,
        rows: &[TechnicalResponseRow],
    ) -> Result<HashMap<Uuid, CandidateRef>> {
        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = rows
            .iter()
            .filter_map(|row| row.applicant_id)
            .filter(|id| seen.insert(*id))
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        debug!(candidates = ids.len(), "Resolving candidate profiles");
        let profiles: Vec<CandidateRef> = self
            .data
            .select(
                CANDIDATE_PROFILES_TABLE,
                "id,full_name,email",
                &[in_filter("id", &ids)],
            )
            .await?;
        Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
    }
}

/// Groups rows by application in first-seen order.
///
/// The average divides the sum of scored rows by the total row count, so an
/// unscored answer counts as zero until the scorer catches up; any unscored
/// row keeps the group pending.
pub fn group_results(
    rows: Vec<TechnicalResponseRow>,
    candidates: &HashMap<Uuid, CandidateRef>,
) -> Vec<TechnicalResultGroup> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_application: HashMap<Uuid, Vec<TechnicalResponseRow>> = HashMap::new();
    for row in rows {
        let responses = by_application.entry(row.application_id).or_insert_with(|| {
            order.push(row.application_id);
            Vec::new()
        });
        responses.push(row);
    }

    order
        .into_iter()
        .filter_map(|application_id| {
            let responses = by_application.remove(&application_id)?;
            let applicant_id = responses.iter().find_map(|r| r.applicant_id);
            let candidate = applicant_id.and_then(|id| candidates.get(&id));
            let job_title = responses.iter().find_map(|r| r.job_title.clone());

            let total: f64 = responses.iter().filter_map(|r| r.score).sum();
            let average_score = total / responses.len() as f64;
            let status = if responses.iter().any(|r| r.score.is_none()) {
                TechnicalStatus::Pending
            } else {
                TechnicalStatus::Completed
            };

            Some(TechnicalResultGroup {
                application_id,
                applicant_id,
                candidate_name: candidate.and_then(|c| c.full_name.clone()),
                candidate_email: candidate.and_then(|c| c.email.clone()),
                job_title,
                responses,
                average_score,
                status,
            })
        })
        .collect()
}
