pub mod key;
pub mod mutation;
pub mod query_client;
pub mod retry;
pub mod store;

pub use key::QueryKey;
pub use mutation::Mutation;
pub use query_client::QueryClient;
pub use retry::RetryPolicy;
pub use store::{CacheEntry, CacheStore, MemoryStore};
