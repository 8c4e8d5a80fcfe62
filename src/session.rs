use async_trait::async_trait;
use std::sync::RwLock;

/// Source of the signed-in user's access token.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// `None` when nobody is signed in.
    async fn access_token(&self) -> Option<String>;
}

/// Session held in memory; swap the token on sign-in, refresh or sign-out.
#[derive(Debug, Default)]
pub struct StaticSession {
    token: RwLock<Option<String>>,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn access_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|t| !t.trim().is_empty())
    }
}
