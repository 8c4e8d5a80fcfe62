use reqwest::{multipart::Form, Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, ErrorDetail, Result};
use crate::services::notification_service::{Notification, Notifier};
use crate::session::SessionProvider;
use crate::utils::token;

/// Header the REST backend reads the session token from.
pub const SESSION_HEADER: &str = "x-supabase-auth";

/// How a request proves who is calling.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// Session token in [`SESSION_HEADER`]; used by the REST backend.
    SessionHeader,
    /// Project key in `apikey` plus the session as a bearer token; used by PostgREST.
    Bearer { api_key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Authenticated,
    Public,
}

/// Authenticated JSON client with one error and logging policy for every call.
///
/// Failed writes are reported to the [`Notifier`] here. Failed reads are not:
/// a read may be retried, so whoever gives up on it reports it once (see
/// [`QueryClient::fetch`](crate::cache::QueryClient::fetch)).
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    scheme: AuthScheme,
    session: Arc<dyn SessionProvider>,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self::with_parts(
            client,
            config.api_base_url.clone(),
            AuthScheme::SessionHeader,
            session,
            notifier,
        ))
    }

    pub fn with_parts(
        client: Client,
        base_url: Url,
        scheme: AuthScheme,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            base_url,
            scheme,
            session,
            notifier,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Method::GET, path, Access::Authenticated, |r| r)
            .await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(Method::GET, path, Access::Authenticated, |r| r.query(query))
            .await
    }

    /// Unauthenticated read; never consults the session.
    pub async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Method::GET, path, Access::Public, |r| r).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(Method::POST, path, Access::Authenticated, |r| r.json(body))
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(Method::PUT, path, Access::Authenticated, |r| r.json(body))
            .await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(Method::PATCH, path, Access::Authenticated, |r| r.json(body))
            .await
    }

    /// PATCH under optimistic locking. A 409 means the stored version moved
    /// on and surfaces as [`Error::VersionConflict`], reported once.
    pub async fn patch_versioned<T, B>(&self, path: &str, body: &B, job_id: Uuid) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let result = self
            .send(Method::PATCH, path, Access::Authenticated, |r| r.json(body))
            .await;
        let result = match result {
            Err(Error::Api { status: 409, .. }) => Err(Error::VersionConflict { job_id }),
            other => other,
        };
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Method::DELETE, path, Access::Authenticated, |r| r)
            .await
    }

    /// DELETE with query-string filters. `Prefer: return=representation`
    /// makes PostgREST echo the removed rows instead of an empty 204.
    pub async fn delete_returning<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(Method::DELETE, path, Access::Authenticated, |r| {
            r.query(query).header("Prefer", "return=representation")
        })
        .await
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        self.execute(Method::POST, path, Access::Authenticated, |r| {
            r.multipart(form)
        })
        .await
    }

    /// Current session token, or `AuthenticationRequired` when there is no
    /// usable session. Never touches the network.
    async fn session_token(&self) -> Result<String> {
        match self.session.access_token().await {
            Some(token) if !token::is_expired(&token) => Ok(token),
            Some(_) => {
                warn!("Session token has expired");
                Err(Error::AuthenticationRequired)
            }
            None => {
                warn!("Request attempted without a session");
                Err(Error::AuthenticationRequired)
            }
        }
    }

    fn authorize(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match (&self.scheme, token) {
            (AuthScheme::SessionHeader, Some(token)) => request.header(SESSION_HEADER, token),
            (AuthScheme::SessionHeader, None) => request,
            (AuthScheme::Bearer { api_key }, Some(token)) => request
                .header("apikey", api_key)
                .bearer_auth(token),
            (AuthScheme::Bearer { api_key }, None) => request
                .header("apikey", api_key)
                .bearer_auth(api_key),
        }
    }

    async fn execute<T, F>(&self, method: Method, path: &str, access: Access, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let is_read = method == Method::GET;
        let result = self.send(method, path, access, build).await;
        if let Err(err) = &result {
            if !is_read {
                self.report(err);
            }
        }
        result
    }

    async fn send<T, F>(&self, method: Method, path: &str, access: Access, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let token = match access {
            Access::Authenticated => Some(self.session_token().await?),
            Access::Public => None,
        };

        let url = self.url(path)?;
        let request = self.client.request(method.clone(), url);
        let request = build(self.authorize(request, token.as_deref()));

        let started = Instant::now();
        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status();
                response.bytes().await.map(|body| (status, body))
            }
            Err(err) => Err(err),
        };
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let (status, body) = match outcome {
            Ok(parts) => parts,
            Err(err) => {
                let err = Error::from(err);
                error!(%method, path, duration_ms, error = %err, "Request failed");
                return Err(err);
            }
        };

        log_response(&method, path, status, duration_ms);

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                detail: ErrorDetail::from_body(status, &body),
            });
        }

        decode_body(&body)
    }

    /// Sends the user-facing notification for `err`, if it deserves one.
    pub fn report(&self, err: &Error) {
        if let Some(notification) = Notification::for_failure(err) {
            self.notifier.notify(notification);
        }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }
}

fn log_response(method: &Method, path: &str, status: StatusCode, duration_ms: f64) {
    let code = status.as_u16();
    if status.is_server_error() {
        error!(%method, path, status = code, duration_ms, "Response");
    } else if status.is_client_error() {
        warn!(%method, path, status = code, duration_ms, "Response");
    } else {
        info!(%method, path, status = code, duration_ms, "Response");
    }
}

/// Empty bodies (204) decode as JSON `null` so `()` and `Option<T>` work.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| Error::MalformedResponse(e.to_string()))
}
