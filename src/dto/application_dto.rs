use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::application::ApplicationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApplicationStatusUpdate {
    #[validate(custom(function = "validate_review_status"))]
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

fn validate_review_status(status: &ApplicationStatus) -> Result<(), ValidationError> {
    if status.is_review_decision() {
        Ok(())
    } else {
        Err(ValidationError::new("status")
            .with_message("Status must be reviewing, shortlisted, rejected or hired".into()))
    }
}
