use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfilePayload {
    #[validate(length(min = 2, max = 100))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[validate(length(max = 20))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    #[validate(range(min = 0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<i32>,
    #[validate(length(max = 1000))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Resume,
    Picture,
}

impl UploadKind {
    pub fn path(&self) -> &'static str {
        match self {
            UploadKind::Resume => "/api/candidates/upload/resume",
            UploadKind::Picture => "/api/candidates/upload/picture",
        }
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        match self {
            UploadKind::Resume => matches!(
                content_type,
                "application/pdf"
                    | "application/msword"
                    | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            UploadKind::Picture => content_type.starts_with("image/"),
        }
    }
}
