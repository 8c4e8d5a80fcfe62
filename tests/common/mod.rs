#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Router;
use mockall::mock;
use recruitment_sync::{
    config::Config,
    services::notification_service::{Notification, Notifier},
};
use tokio::net::TcpListener;

pub const SESSION_TOKEN: &str = "session-token-for-tests";
pub const ANON_KEY: &str = "anon-key-for-tests";

mock! {
    pub Notifier {}
    impl Notifier for Notifier {
        fn notify(&self, notification: Notification);
    }
}

/// Notifier that accepts any number of notifications.
pub fn quiet_notifier() -> Arc<dyn Notifier> {
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().returning(|_| ());
    Arc::new(notifier)
}

/// Serves `app` on an ephemeral port and returns its base URL.
pub async fn spawn_backend(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

/// Backend and PostgREST share the fake server; PostgREST lives under `/rest/v1`.
pub fn config_for(base: &str) -> Config {
    Config::new(base, base, ANON_KEY).expect("config")
}

#[derive(Clone, Default)]
pub struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
