use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::job_role::{JobResponsibility, JobSkill, TechnicalQuestion};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobPayload {
    #[validate(length(min = 2, max = 200))]
    pub title: String,
    #[validate(length(min = 2, max = 100))]
    pub department: String,
    #[validate(length(min = 10))]
    pub description: String,
    #[validate(length(min = 10))]
    pub requirements: String,
}

/// Full posting as created from the employee workspace.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_salary_range"))]
pub struct CreateEmployeeJobPayload {
    #[validate(length(min = 2, max = 200))]
    pub title: String,
    #[validate(length(min = 2, max = 100))]
    pub department: String,
    #[validate(length(min = 10))]
    pub description: String,
    #[validate(length(min = 10))]
    pub requirements: String,
    pub employment_type: Option<String>,
    pub work_mode: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub key_business_objective: Option<String>,
    #[validate(range(min = 0, message = "Experience cannot be negative"))]
    pub min_experience: Option<i32>,
    #[serde(default)]
    pub is_english_required: bool,
    #[serde(default)]
    pub is_coding_required: bool,
    #[serde(default)]
    pub is_technical_required: bool,
    #[serde(default)]
    pub technical_questions: Vec<TechnicalQuestion>,
    #[serde(default)]
    pub responsibilities: Vec<JobResponsibility>,
    #[serde(default)]
    pub skills: Vec<JobSkill>,
}

fn validate_salary_range(payload: &CreateEmployeeJobPayload) -> Result<(), ValidationError> {
    if let (Some(min), Some(max)) = (payload.salary_min, payload.salary_max) {
        if min > max {
            return Err(ValidationError::new("salary_range")
                .with_message("Minimum salary cannot exceed maximum salary".into()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateJobPayload {
    #[validate(length(min = 2, max = 200))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[validate(length(min = 2, max = 100))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[validate(length(min = 10))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(length(min = 10))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    /// Version the caller last read; the backend answers 409 when it moved on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<i32>,
}

/// Partial edit from the employee workspace. `Some` lists replace the stored
/// ones wholesale; an approved job goes back to pending on the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_update_salary_range"))]
pub struct UpdateEmployeeJobPayload {
    #[validate(length(min = 2, max = 200))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[validate(length(min = 2, max = 100))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[validate(length(min = 10))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(length(min = 10))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_business_objective: Option<String>,
    #[validate(range(min = 0, message = "Experience cannot be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_experience: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_english_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_coding_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_technical_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_questions: Option<Vec<TechnicalQuestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsibilities: Option<Vec<JobResponsibility>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<JobSkill>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<i32>,
}

fn validate_update_salary_range(payload: &UpdateEmployeeJobPayload) -> Result<(), ValidationError> {
    if let (Some(min), Some(max)) = (payload.salary_min, payload.salary_max) {
        if min > max {
            return Err(ValidationError::new("salary_range")
                .with_message("Minimum salary cannot exceed maximum salary".into()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectJobPayload {
    #[validate(length(min = 5, max = 500))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ApplyPayload {
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentField {
    Description,
    Responsibilities,
    Requirements,
    TechnicalQuestions,
    KeyBusinessObjective,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateContentPayload {
    pub field_name: ContentField,
    /// Job title, optionally followed by `| focus area`.
    #[validate(length(min = 2))]
    pub context: String,
    pub tone: String,
}

impl GenerateContentPayload {
    pub fn new(field_name: ContentField, context: impl Into<String>) -> Self {
        Self {
            field_name,
            context: context.into(),
            tone: "professional".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub content: String,
    pub technical_questions: Option<Vec<TechnicalQuestion>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_reason_bounds() {
        assert!(RejectJobPayload { reason: "bad".into() }.validate().is_err());
        assert!(RejectJobPayload {
            reason: "Duplicate posting".into()
        }
        .validate()
        .is_ok());
        assert!(RejectJobPayload {
            reason: "x".repeat(501)
        }
        .validate()
        .is_err());
    }

    #[test]
    fn update_payload_only_sends_present_fields() {
        let payload = UpdateJobPayload {
            title: Some("Staff Engineer".into()),
            current_version: Some(3),
            ..Default::default()
        };
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "title": "Staff Engineer", "current_version": 3 })
        );
    }

    #[test]
    fn employee_update_sends_replaced_lists_only() {
        let payload = UpdateEmployeeJobPayload {
            skills: Some(vec![JobSkill {
                skill_name: "Rust".into(),
                min_years: Some(2),
                is_mandatory: true,
            }]),
            responsibilities: Some(vec![]),
            current_version: Some(4),
            ..Default::default()
        };
        assert!(payload.validate().is_ok());
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["responsibilities"], serde_json::json!([]));
        assert!(body.get("technical_questions").is_none());
        assert_eq!(body["current_version"], 4);

        let inverted = UpdateEmployeeJobPayload {
            salary_min: Some(Decimal::new(9, 0)),
            salary_max: Some(Decimal::new(1, 0)),
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn salary_range_must_be_ordered() {
        let payload = CreateEmployeeJobPayload {
            title: "Analyst".into(),
            department: "Finance".into(),
            description: "Analyse the numbers".into(),
            requirements: "Spreadsheets and SQL".into(),
            employment_type: None,
            work_mode: None,
            location: None,
            salary_min: Some(Decimal::new(5000, 0)),
            salary_max: Some(Decimal::new(3000, 0)),
            key_business_objective: None,
            min_experience: Some(2),
            is_english_required: false,
            is_coding_required: false,
            is_technical_required: false,
            technical_questions: vec![],
            responsibilities: vec![],
            skills: vec![],
        };
        assert!(payload.validate().is_err());
    }
}
