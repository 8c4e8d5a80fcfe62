use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::event::{ChangeEvent, RealtimeNotice, Table};
use super::transport::RealtimeTransport;
use crate::cache::QueryClient;
use crate::error::{Error, Result};
use crate::services::notification_service::{Notification, Notifier};

/// Called once per change, after the affected cache keys are invalidated.
pub type ChangeCallback = Arc<dyn Fn(RealtimeNotice) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Subscribed,
}

struct ActiveChannel {
    id: u64,
    cancel: CancellationToken,
    pump: JoinHandle<()>,
}

impl ActiveChannel {
    fn close(self) {
        self.cancel.cancel();
        self.pump.abort();
    }
}

struct Inner {
    transport: Arc<dyn RealtimeTransport>,
    queries: QueryClient,
    /// Held across `open` so replacing a table's channel is one step.
    channels: Mutex<HashMap<Table, ActiveChannel>>,
    /// Readable without awaiting; entries are tagged with the channel id.
    states: StdMutex<HashMap<Table, (u64, SubscriptionState)>>,
    next_id: AtomicU64,
}

impl Inner {
    fn set_state(&self, table: Table, id: u64, state: SubscriptionState) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.insert(table, (id, state));
    }

    /// Marks the table unsubscribed only if `id` is still its channel.
    fn clear_state_if_current(&self, table: Table, id: u64) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((current, state)) = states.get_mut(&table) {
            if *current == id {
                *state = SubscriptionState::Unsubscribed;
            }
        }
    }

    fn state(&self, table: Table) -> SubscriptionState {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states
            .get(&table)
            .map(|(_, state)| *state)
            .unwrap_or(SubscriptionState::Unsubscribed)
    }
}

/// Owns at most one live realtime channel per table.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Inner>,
}

impl SubscriptionManager {
    pub fn new(transport: Arc<dyn RealtimeTransport>, queries: QueryClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                queries,
                channels: Mutex::new(HashMap::new()),
                states: StdMutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn state(&self, table: Table) -> SubscriptionState {
        self.inner.state(table)
    }

    pub async fn active_channels(&self) -> usize {
        self.inner.channels.lock().await.len()
    }

    /// Opens a channel for `table`, first tearing down any channel already
    /// open for it.
    pub async fn subscribe(&self, table: Table, callback: ChangeCallback) -> Result<Teardown> {
        let inner = &self.inner;
        let mut channels = inner.channels.lock().await;

        if let Some(previous) = channels.remove(&table) {
            info!(table = %table, channel = previous.id, "Replacing realtime channel");
            previous.close();
        }

        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        inner.set_state(table, id, SubscriptionState::Subscribing);

        let cancel = CancellationToken::new();
        let rx = match inner.transport.open(table, cancel.clone()).await {
            Ok(rx) => rx,
            Err(e) => {
                inner.set_state(table, id, SubscriptionState::Unsubscribed);
                error!(table = %table, error = %e, "Realtime subscription failed");
                return Err(match e {
                    Error::Realtime(_) => e,
                    other => Error::Realtime(other.to_string()),
                });
            }
        };

        let pump = tokio::spawn(pump_changes(Arc::clone(inner), table, id, rx, callback));
        channels.insert(table, ActiveChannel { id, cancel, pump });
        inner.set_state(table, id, SubscriptionState::Subscribed);
        info!(table = %table, channel = id, "Realtime subscription active");

        Ok(Teardown {
            inner: Arc::clone(inner),
            channels: vec![(table, id)],
        })
    }

    pub async fn subscribe_jobs(&self, callback: ChangeCallback) -> Result<Teardown> {
        self.subscribe(Table::JobRoles, callback).await
    }

    pub async fn subscribe_applications(&self, callback: ChangeCallback) -> Result<Teardown> {
        self.subscribe(Table::Applications, callback).await
    }

    /// Subscribes to every table; the returned handle closes all of them.
    /// If any table fails, the ones already opened are closed again.
    pub async fn subscribe_all(&self, callback: ChangeCallback) -> Result<Teardown> {
        let mut composite = Teardown::empty(Arc::clone(&self.inner));
        for table in Table::ALL {
            match self.subscribe(table, Arc::clone(&callback)).await {
                Ok(teardown) => composite = composite.join(teardown),
                Err(e) => {
                    composite.close().await;
                    return Err(e);
                }
            }
        }
        Ok(composite)
    }

    /// Closes whatever channel is open for `table`.
    pub async fn unsubscribe(&self, table: Table) -> bool {
        let removed = self.inner.channels.lock().await.remove(&table);
        match removed {
            Some(channel) => {
                self.inner.clear_state_if_current(table, channel.id);
                channel.close();
                info!(table = %table, "Realtime subscription closed");
                true
            }
            None => false,
        }
    }

    pub async fn unsubscribe_all(&self) {
        let drained: Vec<(Table, ActiveChannel)> =
            self.inner.channels.lock().await.drain().collect();
        for (table, channel) in drained {
            self.inner.clear_state_if_current(table, channel.id);
            channel.close();
        }
    }
}

/// Handle for channels opened by one `subscribe*` call.
///
/// Closing only affects channels this handle created. A channel already
/// replaced by a later `subscribe` for the same table is left alone.
#[must_use = "dropping a Teardown leaves its channels open"]
pub struct Teardown {
    inner: Arc<Inner>,
    channels: Vec<(Table, u64)>,
}

impl Teardown {
    fn empty(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            channels: Vec::new(),
        }
    }

    pub fn join(mut self, other: Teardown) -> Self {
        self.channels.extend(other.channels);
        self
    }

    pub fn tables(&self) -> Vec<Table> {
        self.channels.iter().map(|(table, _)| *table).collect()
    }

    /// Returns how many channels were actually closed.
    pub async fn close(self) -> usize {
        let mut channels = self.inner.channels.lock().await;
        let mut closed = 0;
        for (table, id) in &self.channels {
            if channels.get(table).map(|c| c.id) != Some(*id) {
                debug!(table = %table, channel = id, "Channel already replaced or closed");
                continue;
            }
            if let Some(channel) = channels.remove(table) {
                self.inner.clear_state_if_current(*table, *id);
                channel.close();
                closed += 1;
            }
        }
        if closed > 0 {
            info!(closed, "Realtime channels torn down");
        }
        closed
    }
}

async fn pump_changes(
    inner: Arc<Inner>,
    table: Table,
    id: u64,
    mut rx: mpsc::Receiver<ChangeEvent>,
    callback: ChangeCallback,
) {
    while let Some(event) = rx.recv().await {
        let keys = event.invalidation_keys();
        let hit = inner.queries.invalidate_all(&keys);
        debug!(table = %table, kind = ?event.kind, keys = keys.len(), hit, "Change received");
        callback(event.notice());
    }
    // Sender dropped: cancelled or the socket ended. No reconnect.
    let mut channels = inner.channels.lock().await;
    if channels.get(&table).is_some_and(|c| c.id == id) {
        if let Some(dead) = channels.remove(&table) {
            dead.cancel.cancel();
        }
    }
    inner.clear_state_if_current(table, id);
    drop(channels);
    info!(table = %table, channel = id, "Realtime channel ended");
}

/// Callback that surfaces every change as an info notification.
pub fn notify_changes(notifier: Arc<dyn Notifier>) -> ChangeCallback {
    Arc::new(move |notice: RealtimeNotice| {
        let title = match notice.table {
            Table::JobRoles => "Jobs",
            Table::Applications => "Applications",
        };
        notifier.notify(Notification::info(title, notice.message));
    })
}
