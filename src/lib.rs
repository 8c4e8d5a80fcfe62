pub mod cache;
pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod realtime;
pub mod services;
pub mod session;
pub mod utils;

use crate::cache::{MemoryStore, QueryClient, RetryPolicy};
use crate::config::Config;
use crate::error::Result;
use crate::realtime::{PhoenixTransport, RealtimeTransport, SubscriptionManager};
use crate::services::{
    admin_service::AdminService, api_client::ApiClient, application_service::ApplicationService,
    candidate_service::CandidateService, data_client::DataClient, job_service::JobService,
    notification_service::Notifier, storage_service::StorageService,
    technical_service::TechnicalService,
};
use crate::session::SessionProvider;
use std::sync::Arc;

/// Every service wired to one session, one notifier and one shared cache.
#[derive(Clone)]
pub struct HiringClient {
    pub queries: QueryClient,
    pub jobs: JobService,
    pub applications: ApplicationService,
    pub admin: AdminService,
    pub candidates: CandidateService,
    pub storage: StorageService,
    pub technical: TechnicalService,
    pub realtime: SubscriptionManager,
}

impl HiringClient {
    pub fn new(
        config: &Config,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let transport = Arc::new(PhoenixTransport::new(config, session.clone()));
        Self::with_transport(config, session, notifier, transport)
    }

    /// Same as [`HiringClient::new`] with a caller-supplied realtime transport.
    pub fn with_transport(
        config: &Config,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
        transport: Arc<dyn RealtimeTransport>,
    ) -> Result<Self> {
        let queries = QueryClient::new(Arc::new(MemoryStore::new()))
            .with_stale_time(config.stale_time)
            .with_retry(RetryPolicy::default().with_max_retries(config.max_retries))
            .with_notifier(notifier.clone());

        let api = ApiClient::new(config, session.clone(), notifier.clone())?;
        let data = DataClient::new(config, session, notifier)?;

        Ok(Self {
            jobs: JobService::new(api.clone(), queries.clone()),
            applications: ApplicationService::new(api.clone(), data.clone(), queries.clone()),
            admin: AdminService::new(api.clone(), data.clone(), queries.clone()),
            candidates: CandidateService::new(api.clone(), queries.clone()),
            storage: StorageService::new(api),
            technical: TechnicalService::new(
                data,
                queries.clone(),
                config.technical_results_limit,
            ),
            realtime: SubscriptionManager::new(transport, queries.clone()),
            queries,
        })
    }
}
