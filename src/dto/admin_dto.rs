use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::UserRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UsersQuery {
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl UsersQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            limit: 10,
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.trim().is_empty()).then_some(search);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentsQuery {
    pub limit: u32,
}

impl Default for AssessmentsQuery {
    fn default() -> Self {
        Self { limit: 20 }
    }
}
