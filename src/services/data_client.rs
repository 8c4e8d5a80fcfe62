use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt::Display;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, ErrorDetail, Result};
use crate::services::api_client::{ApiClient, AuthScheme};
use crate::services::notification_service::Notifier;
use crate::session::SessionProvider;

/// Row-level reads and deletes against the project's PostgREST endpoint.
///
/// Shares the [`ApiClient`] request path, so auth fail-fast, error detail
/// parsing and timing logs behave the same as for the REST backend.
#[derive(Clone)]
pub struct DataClient {
    api: ApiClient,
}

impl DataClient {
    pub fn new(
        config: &Config,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        let base_url = config.supabase_url.join("rest/v1/")?;
        Ok(Self::from_api(ApiClient::with_parts(
            client,
            base_url,
            AuthScheme::Bearer {
                api_key: config.supabase_anon_key.clone(),
            },
            session,
            notifier,
        )))
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET /{table}?select=...&<filters>`
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<T>> {
        let mut query: Vec<(String, String)> = Vec::with_capacity(filters.len() + 1);
        query.push(("select".to_string(), columns.to_string()));
        query.extend(filters.iter().cloned());
        self.api.get_with_query(table, &query).await
    }

    /// `DELETE /{table}?<filters>`. Returns how many rows went away.
    pub async fn delete(&self, table: &str, filters: &[(String, String)]) -> Result<usize> {
        let removed: Vec<JsonValue> = self.api.delete_returning(table, filters).await?;
        info!(table, removed = removed.len(), "Rows deleted");
        Ok(removed.len())
    }

    /// Deletes the row with `id`. A row that does not exist, or that
    /// row-level security hides, comes back as a 404.
    pub async fn delete_by_id(&self, table: &str, id: Uuid) -> Result<()> {
        match self.delete(table, &[eq_filter("id", id)]).await? {
            0 => Err(Error::Api {
                status: 404,
                detail: ErrorDetail::message(format!("No {} row with id {}", table, id)),
            }),
            _ => Ok(()),
        }
    }
}

pub fn eq_filter(column: &str, value: impl Display) -> (String, String) {
    (column.to_string(), format!("eq.{}", value))
}

pub fn in_filter<I, V>(column: &str, values: I) -> (String, String)
where
    I: IntoIterator<Item = V>,
    V: Display,
{
    let joined = values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    (column.to_string(), format!("in.({})", joined))
}

pub fn order_desc(column: &str) -> (String, String) {
    ("order".to_string(), format!("{}.desc", column))
}

pub fn limit(n: usize) -> (String, String) {
    ("limit".to_string(), n.to_string())
}
