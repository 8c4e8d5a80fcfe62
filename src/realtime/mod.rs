pub mod event;
pub mod manager;
pub mod phoenix;
pub mod transport;

pub use event::{parse_postgres_change, ChangeEvent, ChangeKind, RealtimeNotice, Table};
pub use manager::{notify_changes, ChangeCallback, SubscriptionManager, SubscriptionState, Teardown};
pub use phoenix::PhoenixTransport;
pub use transport::RealtimeTransport;
