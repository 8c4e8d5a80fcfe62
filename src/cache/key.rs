use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Structured cache address: an ordered list of segments, root first.
///
/// `["users", "2", "10", "alice"]` addresses page 2 (10 per page) of the
/// users list filtered by "alice". Invalidation matches by prefix, so `["users"]` covers every page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn root(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn stats() -> Self {
        Self::new(["stats"])
    }

    /// Prefix for every users page.
    pub fn users() -> Self {
        Self::new(["users"])
    }

    pub fn users_page(page: u32, limit: u32, search: Option<&str>) -> Self {
        Self::new([
            "users".to_string(),
            page.to_string(),
            limit.to_string(),
            search.unwrap_or_default().to_string(),
        ])
    }

    /// Prefix for every assessments listing.
    pub fn assessments() -> Self {
        Self::new(["assessments"])
    }

    pub fn assessments_page(limit: u32) -> Self {
        Self::new(["assessments".to_string(), limit.to_string()])
    }

    pub fn assessment(id: Uuid) -> Self {
        Self::new(["assessment".to_string(), id.to_string()])
    }

    pub fn applications() -> Self {
        Self::new(["applications"])
    }

    pub fn my_applications() -> Self {
        Self::new(["my-applications"])
    }

    /// Prefix for every per-job application list.
    pub fn all_job_applications() -> Self {
        Self::new(["job-applications"])
    }

    pub fn job_applications(job_id: Uuid) -> Self {
        Self::new(["job-applications".to_string(), job_id.to_string()])
    }

    pub fn jobs() -> Self {
        Self::new(["jobs"])
    }

    pub fn pending_jobs() -> Self {
        Self::new(["pending-jobs"])
    }

    pub fn public_jobs() -> Self {
        Self::new(["public-jobs"])
    }

    /// Raw table key used by the realtime layer.
    pub fn job_roles() -> Self {
        Self::new(["job_roles"])
    }

    pub fn job(id: Uuid) -> Self {
        Self::new(["job".to_string(), id.to_string()])
    }

    pub fn job_approvals(id: Uuid) -> Self {
        Self::new(["job-approvals".to_string(), id.to_string()])
    }

    /// Prefix for the employee's own jobs and each detailed view.
    pub fn employee_jobs() -> Self {
        Self::new(["employee-jobs"])
    }

    pub fn employee_job(id: Uuid) -> Self {
        Self::new(["employee-jobs".to_string(), id.to_string()])
    }

    pub fn employee_stats() -> Self {
        Self::new(["employee-stats"])
    }

    /// Prefix covering the unfiltered and every per-application result set.
    pub fn technical_results_all() -> Self {
        Self::new(["technical-results"])
    }

    pub fn technical_results(application_id: Option<Uuid>) -> Self {
        match application_id {
            Some(id) => Self::new(["technical-results".to_string(), id.to_string()]),
            None => Self::new(["technical-results".to_string(), "all".to_string()]),
        }
    }

    pub fn candidate_profile() -> Self {
        Self::new(["candidate-profile"])
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
