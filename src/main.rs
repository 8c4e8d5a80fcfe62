use recruitment_sync::{
    config::{get_config, init_config},
    realtime::{notify_changes, RealtimeNotice},
    services::notification_service::{Notifier, TracingNotifier},
    session::StaticSession,
    HiringClient,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    init_config()?;
    let config = get_config()?;

    let token = std::env::var("SESSION_TOKEN")
        .map_err(|_| anyhow::anyhow!("SESSION_TOKEN environment variable is required"))?;
    let session = Arc::new(StaticSession::new(token));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let client = HiringClient::new(config, session, notifier.clone())?;
    info!(api = %config.api_base_url, realtime = %config.realtime_url, "sync-agent starting");

    match client.jobs.list_jobs().await {
        Ok(jobs) => info!(count = jobs.len(), "Jobs cached"),
        Err(e) => warn!(error = %e, "Could not warm jobs"),
    }
    match client.jobs.pending_jobs().await {
        Ok(jobs) => info!(count = jobs.len(), "Pending jobs cached"),
        Err(e) => warn!(error = %e, "Could not warm pending jobs"),
    }
    match client.admin.stats().await {
        Ok(stats) => info!(candidates = stats.total_candidates, "Stats cached"),
        Err(e) => warn!(error = %e, "Could not warm stats"),
    }

    let toast = notify_changes(notifier);
    let teardown = client
        .realtime
        .subscribe_all(Arc::new(move |notice: RealtimeNotice| {
            info!(
                table = %notice.table,
                kind = ?notice.kind,
                record = ?notice.record_id,
                "{}",
                notice.message
            );
            toast(notice);
        }))
        .await?;

    info!("Listening for changes, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    let closed = teardown.close().await;
    info!(closed, "sync-agent stopped");
    Ok(())
}
