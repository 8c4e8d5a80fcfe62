use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use tracing::info;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::cache::{Mutation, QueryClient, QueryKey};
use crate::dto::candidate_dto::{UpdateProfilePayload, UploadKind};
use crate::error::Result;
use crate::models::candidate::{CandidateProfile, UploadResult};
use crate::services::api_client::ApiClient;

const RESUME_EXTENSIONS: [&str; 3] = [".pdf", ".doc", ".docx"];

/// A file picked by the user, ready to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Clone)]
pub struct CandidateService {
    api: ApiClient,
    queries: QueryClient,
}

impl CandidateService {
    pub fn new(api: ApiClient, queries: QueryClient) -> Self {
        Self { api, queries }
    }

    pub async fn profile(&self) -> Result<CandidateProfile> {
        self.queries
            .fetch(QueryKey::candidate_profile(), || {
                self.api.get("/api/candidates/me")
            })
            .await
    }

    pub async fn update_profile(&self, payload: UpdateProfilePayload) -> Result<CandidateProfile> {
        payload.validate()?;
        self.queries
            .mutate(
                Mutation::UpdateProfile,
                self.api.put("/api/candidates/me", &payload),
            )
            .await
    }

    pub async fn upload_resume(&self, file: UploadFile) -> Result<String> {
        self.upload(UploadKind::Resume, Mutation::UploadResume, file)
            .await
    }

    pub async fn upload_picture(&self, file: UploadFile) -> Result<String> {
        self.upload(UploadKind::Picture, Mutation::UploadPicture, file)
            .await
    }

    async fn upload(&self, kind: UploadKind, mutation: Mutation, file: UploadFile) -> Result<String> {
        check_upload(kind, &file)?;

        let size = file.data.len();
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part("file", part);

        let result: UploadResult = self
            .queries
            .mutate(mutation, self.api.post_multipart(kind.path(), form))
            .await?;
        info!(file = %file.file_name, size, kind = ?kind, "Upload complete");
        Ok(result.url)
    }
}

/// Rejects files the backend would refuse, before any bytes are sent.
fn check_upload(kind: UploadKind, file: &UploadFile) -> Result<()> {
    let accepted = match kind {
        UploadKind::Resume => {
            let name = file.file_name.to_lowercase();
            kind.accepts(&file.content_type)
                || RESUME_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        }
        UploadKind::Picture => kind.accepts(&file.content_type),
    };
    if accepted {
        return Ok(());
    }

    let message = match kind {
        UploadKind::Resume => "Only PDF and Word documents are allowed",
        UploadKind::Picture => "Only image files are allowed",
    };
    let mut errors = ValidationErrors::new();
    errors.add(
        "file",
        ValidationError::new("content_type").with_message(message.into()),
    );
    Err(errors.into())
}
