use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::event::{ChangeEvent, Table};
use crate::error::Result;

/// Buffer between a socket reader and the subscriber that consumes it.
pub const CHANNEL_CAPACITY: usize = 64;

/// Opens change feeds for a table.
///
/// `open` returns once the channel is joined. Events arrive on the returned
/// receiver until `cancel` fires or the connection drops; either way the
/// sender is dropped and the receiver yields `None`.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn open(&self, table: Table, cancel: CancellationToken)
        -> Result<mpsc::Receiver<ChangeEvent>>;
}
