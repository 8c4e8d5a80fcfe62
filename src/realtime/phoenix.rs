//! Supabase realtime over the Phoenix channel protocol.
//!
//! One websocket per table channel. The socket joins `realtime:{table}` with
//! a `postgres_changes` filter, keeps itself alive with heartbeats, and
//! forwards every change frame to the subscriber until cancelled.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::event::{parse_postgres_change, ChangeEvent, Table};
use super::transport::{RealtimeTransport, CHANNEL_CAPACITY};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::SessionProvider;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const PROTOCOL_VERSION: &str = "1.0.0";
const JOIN_REF: &str = "1";

#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: JsonValue,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    join_ref: Option<String>,
}

impl Frame {
    fn new(topic: impl Into<String>, event: &str, payload: JsonValue, reference: u64) -> Self {
        Self {
            topic: topic.into(),
            event: event.to_string(),
            payload,
            reference: Some(reference.to_string()),
            join_ref: Some(JOIN_REF.to_string()),
        }
    }

    fn into_message(self) -> Result<Message> {
        Ok(Message::Text(serde_json::to_string(&self)?))
    }
}

pub struct PhoenixTransport {
    url: Url,
    api_key: String,
    session: Arc<dyn SessionProvider>,
    heartbeat: Duration,
}

impl PhoenixTransport {
    pub fn new(config: &Config, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            url: config.realtime_url.clone(),
            api_key: config.supabase_anon_key.clone(),
            session,
            heartbeat: HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    fn socket_url(&self) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair("vsn", PROTOCOL_VERSION);
        url
    }

    fn join_payload(table: Table, access_token: &str) -> JsonValue {
        json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": table.as_str() }
                ]
            },
            "access_token": access_token,
        })
    }
}

#[async_trait]
impl RealtimeTransport for PhoenixTransport {
    async fn open(
        &self,
        table: Table,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<ChangeEvent>> {
        // Row-level security falls back to the anon role without a session.
        let access_token = self
            .session
            .access_token()
            .await
            .unwrap_or_else(|| self.api_key.clone());

        let (ws_stream, _response) = connect_async(self.socket_url().as_str())
            .await
            .map_err(|e| Error::Realtime(format!("Failed to connect for {}: {}", table, e)))?;
        let (mut sink, mut stream) = ws_stream.split();

        let topic = table.topic();
        let join = Frame::new(
            topic.clone(),
            "phx_join",
            Self::join_payload(table, &access_token),
            1,
        );
        sink.send(join.into_message()?)
            .await
            .map_err(|e| Error::Realtime(format!("Failed to join {}: {}", topic, e)))?;

        tokio::time::timeout(JOIN_TIMEOUT, await_join_reply(&mut stream, &topic))
            .await
            .map_err(|_| Error::Realtime(format!("Timed out joining {}", topic)))??;
        tracing::info!(table = %table, "Realtime channel joined");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let heartbeat = self.heartbeat;

        tokio::spawn(async move {
            let mut next_ref: u64 = 2;
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + heartbeat, heartbeat);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let leave = Frame::new(topic.clone(), "phx_leave", json!({}), next_ref);
                        if let Ok(message) = leave.into_message() {
                            let _ = sink.send(message).await;
                        }
                        let _ = sink.close().await;
                        tracing::info!(table = %table, "Realtime channel left");
                        break;
                    }
                    _ = ticker.tick() => {
                        let beat = Frame::new("phoenix", "heartbeat", json!({}), next_ref);
                        next_ref += 1;
                        let sent = match beat.into_message() {
                            Ok(message) => sink.send(message).await.is_ok(),
                            Err(_) => false,
                        };
                        if !sent {
                            tracing::warn!(table = %table, "Heartbeat failed, closing channel");
                            break;
                        }
                    }
                    msg = stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match handle_frame(table, &topic, &text) {
                                    FrameOutcome::Change(event) => {
                                        if tx.send(event).await.is_err() {
                                            tracing::debug!(table = %table, "Subscriber gone");
                                            break;
                                        }
                                    }
                                    FrameOutcome::Closed => break,
                                    FrameOutcome::Ignored => {}
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                tracing::warn!(table = %table, ?frame, "Realtime server closed socket");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::error!(table = %table, error = %e, "Realtime receive error");
                                break;
                            }
                            None => {
                                tracing::warn!(table = %table, "Realtime socket ended");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

async fn await_join_reply<S>(stream: &mut S, topic: &str) -> Result<()>
where
    S: StreamExt<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => return Err(Error::Realtime(e.to_string())),
        };
        let Ok(frame) = serde_json::from_str::<Frame>(&text) else {
            continue;
        };
        if frame.topic != topic
            || frame.event != "phx_reply"
            || frame.reference.as_deref() != Some("1")
        {
            continue;
        }
        return match frame.payload.get("status").and_then(JsonValue::as_str) {
            Some("ok") => Ok(()),
            _ => Err(Error::Realtime(format!(
                "Join rejected for {}: {}",
                topic, frame.payload
            ))),
        };
    }
    Err(Error::Realtime(format!("Socket closed while joining {}", topic)))
}

#[derive(Debug, PartialEq)]
enum FrameOutcome {
    Change(ChangeEvent),
    Closed,
    Ignored,
}

fn handle_frame(table: Table, topic: &str, text: &str) -> FrameOutcome {
    let frame = match serde_json::from_str::<Frame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed realtime frame");
            return FrameOutcome::Ignored;
        }
    };
    if frame.topic != topic {
        return FrameOutcome::Ignored;
    }
    match frame.event.as_str() {
        "postgres_changes" => match parse_postgres_change(table, &frame.payload) {
            Some(event) => FrameOutcome::Change(event),
            None => {
                tracing::warn!(table = %table, "Unrecognised change payload");
                FrameOutcome::Ignored
            }
        },
        "phx_error" | "phx_close" => {
            tracing::warn!(table = %table, event = %frame.event, "Realtime channel closed by server");
            FrameOutcome::Closed
        }
        _ => FrameOutcome::Ignored,
    }
}
