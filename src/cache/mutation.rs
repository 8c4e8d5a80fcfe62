use uuid::Uuid;

use super::key::QueryKey;

/// Every write the client can issue, with the cache keys it can affect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateJob,
    CreateEmployeeJob,
    UpdateJob { job_id: Uuid },
    UpdateEmployeeJob { job_id: Uuid },
    DeleteJob { job_id: Uuid },
    ApproveJob { job_id: Uuid },
    RejectJob { job_id: Uuid },
    CloseJob { job_id: Uuid },
    ApplyToJob { job_id: Uuid },
    UpdateApplicationStatus { application_id: Uuid },
    DeleteApplication { application_id: Uuid },
    DeleteUser { user_id: Uuid },
    UpdateUserRole { user_id: Uuid },
    DeleteAssessment { assessment_id: Uuid },
    UpdateProfile,
    UploadResume,
    UploadPicture,
}

impl Mutation {
    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            Mutation::UpdateJob { job_id }
            | Mutation::UpdateEmployeeJob { job_id }
            | Mutation::DeleteJob { job_id }
            | Mutation::ApproveJob { job_id }
            | Mutation::RejectJob { job_id }
            | Mutation::CloseJob { job_id }
            | Mutation::ApplyToJob { job_id } => Some(*job_id),
            _ => None,
        }
    }

    pub fn invalidates(&self) -> Vec<QueryKey> {
        match self {
            Mutation::CreateJob
            | Mutation::CreateEmployeeJob
            | Mutation::UpdateJob { .. }
            | Mutation::UpdateEmployeeJob { .. }
            | Mutation::DeleteJob { .. }
            | Mutation::ApproveJob { .. }
            | Mutation::RejectJob { .. }
            | Mutation::CloseJob { .. } => {
                // Approval counts in stats depend on job state.
                let mut keys = vec![
                    QueryKey::jobs(),
                    QueryKey::pending_jobs(),
                    QueryKey::stats(),
                    QueryKey::public_jobs(),
                    QueryKey::job_roles(),
                    QueryKey::employee_jobs(),
                    QueryKey::employee_stats(),
                ];
                if let Some(id) = self.job_id() {
                    keys.push(QueryKey::job(id));
                    keys.push(QueryKey::job_approvals(id));
                }
                if matches!(self, Mutation::DeleteJob { .. }) {
                    keys.push(QueryKey::applications());
                    keys.push(QueryKey::my_applications());
                }
                keys
            }
            Mutation::ApplyToJob { job_id } => vec![
                QueryKey::my_applications(),
                QueryKey::applications(),
                QueryKey::job_applications(*job_id),
                QueryKey::employee_stats(),
            ],
            Mutation::UpdateApplicationStatus { .. } | Mutation::DeleteApplication { .. } => vec![
                QueryKey::applications(),
                QueryKey::my_applications(),
                QueryKey::all_job_applications(),
                QueryKey::technical_results_all(),
                QueryKey::stats(),
            ],
            Mutation::DeleteUser { .. } => vec![
                QueryKey::users(),
                QueryKey::stats(),
                QueryKey::assessments(),
                QueryKey::applications(),
            ],
            Mutation::UpdateUserRole { .. } => vec![QueryKey::users(), QueryKey::stats()],
            Mutation::DeleteAssessment { assessment_id } => vec![
                QueryKey::assessments(),
                QueryKey::assessment(*assessment_id),
                QueryKey::stats(),
            ],
            Mutation::UpdateProfile | Mutation::UploadResume | Mutation::UploadPicture => {
                vec![QueryKey::candidate_profile()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_job_mutation_invalidates_job_lists() {
        let id = Uuid::new_v4();
        let mutations = [
            Mutation::ApproveJob { job_id: id },
            Mutation::RejectJob { job_id: id },
            Mutation::CloseJob { job_id: id },
            Mutation::CreateJob,
            Mutation::CreateEmployeeJob,
            Mutation::UpdateJob { job_id: id },
            Mutation::UpdateEmployeeJob { job_id: id },
            Mutation::DeleteJob { job_id: id },
        ];
        for mutation in mutations {
            let keys = mutation.invalidates();
            assert!(keys.contains(&QueryKey::jobs()), "{mutation:?}");
            assert!(keys.contains(&QueryKey::pending_jobs()), "{mutation:?}");
            assert!(keys.contains(&QueryKey::stats()), "{mutation:?}");
        }
    }

    #[test]
    fn job_detail_is_invalidated_when_id_known() {
        let id = Uuid::new_v4();
        assert!(Mutation::CloseJob { job_id: id }
            .invalidates()
            .contains(&QueryKey::job(id)));
        assert!(!Mutation::CreateJob
            .invalidates()
            .iter()
            .any(|k| k.root() == "job"));
    }

    #[test]
    fn application_updates_touch_application_views() {
        let keys = Mutation::UpdateApplicationStatus {
            application_id: Uuid::new_v4(),
        }
        .invalidates();
        assert!(keys.contains(&QueryKey::applications()));
        assert!(keys.contains(&QueryKey::technical_results_all()));
        assert!(!keys.contains(&QueryKey::jobs()));
    }
}
