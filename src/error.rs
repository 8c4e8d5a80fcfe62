use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("API error {status}: {detail}")]
    Api { status: u16, detail: ErrorDetail },

    #[error("Job {job_id} has been modified by another user")]
    VersionConflict { job_id: uuid::Uuid },

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Transport(reqwest::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::VersionConflict { .. } => Some(StatusCode::CONFLICT.as_u16()),
            Error::AuthenticationRequired => Some(StatusCode::UNAUTHORIZED.as_u16()),
            _ => None,
        }
    }

    /// Missing session, 401 or 403.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::AuthenticationRequired => true,
            Error::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        if self.is_auth_error() {
            return false;
        }
        !matches!(
            self,
            Error::VersionConflict { .. }
                | Error::Validation(_)
                | Error::Config(_)
                | Error::Url(_)
        )
    }

    /// Whether the failure deserves a user-visible notification. 404s stay silent.
    pub fn should_notify(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status != StatusCode::NOT_FOUND.as_u16(),
            Error::Timeout | Error::Transport(_) | Error::VersionConflict { .. } => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_decode() {
            Error::MalformedResponse(err.to_string())
        } else {
            Error::Transport(err)
        }
    }
}

/// Error payload of a failed backend call, decided once at the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorDetail {
    Message { text: String },
    Validation { fields: Vec<FieldError> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub kind: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    detail: RawDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDetail {
    Text(String),
    Fields(Vec<RawFieldError>),
    Other(JsonValue),
}

#[derive(Deserialize)]
struct RawFieldError {
    #[serde(default)]
    loc: Vec<JsonValue>,
    msg: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl ErrorDetail {
    pub fn message(text: impl Into<String>) -> Self {
        ErrorDetail::Message { text: text.into() }
    }

    pub fn from_body(status: StatusCode, body: &[u8]) -> Self {
        let fallback = || {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                text
            }
        };

        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                detail: RawDetail::Text(text),
            }) => ErrorDetail::Message { text },
            Ok(ErrorEnvelope {
                detail: RawDetail::Fields(fields),
            }) => ErrorDetail::Validation {
                fields: fields.into_iter().map(FieldError::from).collect(),
            },
            Ok(ErrorEnvelope {
                detail: RawDetail::Other(value),
            }) => ErrorDetail::Message {
                text: value.to_string(),
            },
            Err(_) => ErrorDetail::Message { text: fallback() },
        }
    }

    pub fn summary(&self) -> String {
        match self {
            ErrorDetail::Message { text } => text.clone(),
            ErrorDetail::Validation { fields } => fields
                .iter()
                .map(|f| {
                    if f.field.is_empty() {
                        f.message.clone()
                    } else {
                        format!("{}: {}", f.field, f.message)
                    }
                })
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl From<RawFieldError> for FieldError {
    fn from(raw: RawFieldError) -> Self {
        // FastAPI locations start with the request part ("body", "query").
        let field = raw
            .loc
            .iter()
            .skip_while(|segment| {
                matches!(segment.as_str(), Some("body" | "query" | "path" | "header"))
            })
            .map(|segment| match segment {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        FieldError {
            field,
            message: raw.msg,
            kind: raw.kind,
        }
    }
}
