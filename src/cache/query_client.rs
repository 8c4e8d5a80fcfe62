use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::mutation::Mutation;
use super::retry::RetryPolicy;
use super::store::{CacheStore, MemoryStore};
use crate::error::Result;
use crate::services::notification_service::{Notification, Notifier};

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Fetches currently running, and whether an invalidation overtook them.
#[derive(Debug, Default)]
struct InFlight {
    next_id: u64,
    fetches: HashMap<u64, (QueryKey, bool)>,
}

/// Registration of one running fetch; dropping it unregisters.
struct FetchTicket<'a> {
    in_flight: &'a Mutex<InFlight>,
    id: u64,
}

impl FetchTicket<'_> {
    /// Stores the result, stale if an invalidation overtook this fetch.
    /// Holds the in-flight lock so no invalidation can slip in between.
    fn complete(&self, store: &dyn CacheStore, key: QueryKey, data: JsonValue) {
        let guard = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let overtaken = guard.fetches.get(&self.id).is_some_and(|(_, dirty)| *dirty);
        if overtaken {
            debug!(key = %key, "Invalidated while fetching, caching as stale");
            store.put_stale(key, data);
        } else {
            store.put(key, data);
        }
    }
}

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        let mut guard = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        guard.fetches.remove(&self.id);
    }
}

/// Cached reads and invalidating writes over an injectable [`CacheStore`].
#[derive(Clone)]
pub struct QueryClient {
    store: Arc<dyn CacheStore>,
    stale_time: Duration,
    retry: RetryPolicy,
    notifier: Option<Arc<dyn Notifier>>,
    in_flight: Arc<Mutex<InFlight>>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

impl QueryClient {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            stale_time: DEFAULT_STALE_TIME,
            retry: RetryPolicy::default(),
            notifier: None,
            in_flight: Arc::new(Mutex::new(InFlight::default())),
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Where reads that fail for good are reported.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Returns the cached value for `key` while it is fresh, otherwise runs
    /// `fetcher` (with retries) and caches the result.
    ///
    /// A result whose key was invalidated while the fetch was running is
    /// returned but cached as stale, so the next read refetches.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(entry) = self.store.get(&key) {
            if !entry.is_stale(self.stale_time) {
                match serde_json::from_value::<T>(entry.data) {
                    Ok(value) => {
                        debug!(key = %key, "Cache hit");
                        return Ok(value);
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "Cached entry has unexpected shape, refetching");
                    }
                }
            }
        }

        debug!(key = %key, "Cache miss, fetching");
        let ticket = self.register(&key);
        let value = match self.run_with_retry(&key, &fetcher).await {
            Ok(value) => value,
            Err(err) => {
                if let (Some(notifier), Some(notification)) =
                    (&self.notifier, Notification::for_failure(&err))
                {
                    notifier.notify(notification);
                }
                return Err(err);
            }
        };

        ticket.complete(self.store.as_ref(), key, serde_json::to_value(&value)?);
        Ok(value)
    }

    /// Cached value regardless of staleness, without any network call.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.store
            .get(key)
            .and_then(|entry| serde_json::from_value(entry.data).ok())
    }

    pub fn set<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<()> {
        self.store.put(key, serde_json::to_value(value)?);
        Ok(())
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.store
            .get(key)
            .map(|entry| !entry.is_stale(self.stale_time))
            .unwrap_or(false)
    }

    /// Runs a write and, when it succeeds, invalidates everything the
    /// mutation can affect. Failed writes leave the cache untouched.
    pub async fn mutate<T, Fut>(&self, mutation: Mutation, write: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let value = write.await?;
        let keys = mutation.invalidates();
        debug!(mutation = ?mutation, keys = keys.len(), "Mutation succeeded, invalidating");
        self.invalidate_all(&keys);
        Ok(value)
    }

    /// Marks every entry under `prefix` stale, including results of fetches
    /// that are still running.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut guard = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        for (key, dirty) in guard.fetches.values_mut() {
            if key.starts_with(prefix) {
                *dirty = true;
            }
        }
        let hit = self.store.invalidate(prefix);
        drop(guard);
        debug!(key = %prefix, hit, "Invalidated");
        hit
    }

    /// Independent invalidations, one per key; there is no grouping.
    pub fn invalidate_all(&self, prefixes: &[QueryKey]) -> usize {
        prefixes.iter().map(|key| self.invalidate(key)).sum()
    }

    fn register(&self, key: &QueryKey) -> FetchTicket<'_> {
        let mut guard = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let id = guard.next_id;
        guard.next_id += 1;
        guard.fetches.insert(id, (key.clone(), false));
        FetchTicket {
            in_flight: &self.in_flight,
            id,
        }
    }

    async fn run_with_retry<T, F, Fut>(&self, key: &QueryKey, fetcher: &F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut failures = 0;
        loop {
            match fetcher().await {
                Ok(value) => return Ok(value),
                Err(err) if self.retry.should_retry(failures, &err) => {
                    let delay = self.retry.delay(failures);
                    warn!(
                        key = %key,
                        attempt = failures + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Query failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    failures += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorDetail};
    use crate::services::notification_service::ChannelNotifier;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::oneshot;
    use tokio_test::{assert_err, assert_ok};

    fn counting_fetch(
        calls: &AtomicU32,
        value: u32,
    ) -> impl Future<Output = Result<u32>> + '_ {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_reads_do_not_refetch() {
        let client = QueryClient::default();
        let calls = AtomicU32::new(0);

        let first: u32 = client
            .fetch(QueryKey::stats(), || counting_fetch(&calls, 7))
            .await
            .unwrap();
        let second: u32 = client
            .fetch(QueryKey::stats(), || counting_fetch(&calls, 8))
            .await
            .unwrap();

        assert_eq!((first, second), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(DEFAULT_STALE_TIME).await;
        let third: u32 = client
            .fetch(QueryKey::stats(), || counting_fetch(&calls, 9))
            .await
            .unwrap();
        assert_eq!(third, 9);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidated_entries_refetch_on_next_read() {
        let client = QueryClient::default();
        let calls = AtomicU32::new(0);

        let _: u32 = client
            .fetch(QueryKey::jobs(), || counting_fetch(&calls, 1))
            .await
            .unwrap();
        assert!(client.is_fresh(&QueryKey::jobs()));

        client.invalidate(&QueryKey::jobs());
        assert!(!client.is_fresh(&QueryKey::jobs()));
        assert_eq!(client.peek::<u32>(&QueryKey::jobs()), Some(1));

        let value: u32 = client
            .fetch(QueryKey::jobs(), || counting_fetch(&calls, 2))
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_with_backoff() {
        let client = QueryClient::default();
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = tokio::time::Instant::now();

        let value: u32 = client
            .fetch(QueryKey::assessments(), || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::Timeout)
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let client = QueryClient::default();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<u32> = client
            .fetch(QueryKey::stats(), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Api {
                    status: 500,
                    detail: ErrorDetail::message("boom"),
                })
            })
            .await;

        assert!(matches!(result, Err(Error::Api { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(client.peek::<u32>(&QueryKey::stats()).is_none());
    }

    #[tokio::test]
    async fn permission_errors_fail_immediately() {
        let client = QueryClient::default();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<u32> = client
            .fetch(QueryKey::users_page(1, 10, None), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Api {
                    status: 401,
                    detail: ErrorDetail::message("Invalid Token"),
                })
            })
            .await;

        assert!(result.unwrap_err().is_auth_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_mutations_keep_cache_valid() {
        let client = QueryClient::default();
        client.set(QueryKey::jobs(), &vec![1u32]).unwrap();
        let id = uuid::Uuid::new_v4();

        let result: Result<()> = client
            .mutate(Mutation::ApproveJob { job_id: id }, async { Err(Error::Timeout) })
            .await;
        assert_err!(result);
        assert!(client.is_fresh(&QueryKey::jobs()));

        let result: Result<()> = client
            .mutate(Mutation::ApproveJob { job_id: id }, async { Ok(()) })
            .await;
        assert_ok!(result);
        assert!(!client.is_fresh(&QueryKey::jobs()));
    }

    #[tokio::test]
    async fn invalidation_during_fetch_is_not_lost() {
        let client = QueryClient::default();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release = Mutex::new(Some(release_rx));

        let fetch = client.fetch(QueryKey::jobs(), || {
            let gate = release.lock().unwrap().take();
            async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(1u32)
            }
        });
        let change = async {
            tokio::task::yield_now().await;
            client.invalidate(&QueryKey::jobs());
            release_tx.send(()).unwrap();
        };
        let (value, ()) = tokio::join!(fetch, change);

        assert_eq!(value.unwrap(), 1);
        assert!(!client.is_fresh(&QueryKey::jobs()));
        assert_eq!(client.peek::<u32>(&QueryKey::jobs()), Some(1));

        let calls = AtomicU32::new(0);
        let next: u32 = client
            .fetch(QueryKey::jobs(), || counting_fetch(&calls, 2))
            .await
            .unwrap();
        assert_eq!(next, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(client.is_fresh(&QueryKey::jobs()));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_reads_notify_once() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let client = QueryClient::default().with_notifier(Arc::new(notifier));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<u32> = client
            .fetch(QueryKey::stats(), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Api {
                    status: 502,
                    detail: ErrorDetail::message("upstream unavailable"),
                })
            })
            .await;

        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(rx.try_recv().unwrap().message, "upstream unavailable");
        assert!(rx.try_recv().is_err());
    }
}
