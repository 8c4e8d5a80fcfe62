use crate::dto::storage_dto::{SignUrlRequest, SignedUrl};
use crate::error::Result;
use crate::services::api_client::ApiClient;

/// Signs private blob URLs through the backend. Signed URLs expire, so
/// nothing here is cached.
#[derive(Clone)]
pub struct StorageService {
    api: ApiClient,
}

impl StorageService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn sign(&self, url: impl Into<String>, download: bool) -> Result<String> {
        let request = SignUrlRequest {
            url: url.into(),
            download,
        };
        let signed: SignedUrl = self.api.post("/api/storage/sign", &request).await?;
        Ok(signed.url)
    }
}
