//! Bridge client: newline-delimited JSON over TCP.
//!
//! Request/response calls use one connection each:
//! `{"method": ..., "params": ...}` answered by `{"result": ...}` or
//! `{"error": {"message": ...}}`. A subscription keeps its own connection
//! open; after the acknowledgement every line is a push of the form
//! `{"channel": ..., "data": ...}` and is handed to the subscriber's handler
//! from a dedicated task. Unsubscribing aborts that task, which closes the
//! connection. A stream the bridge ends on its own reports
//! [`StreamEvent::Closed`] so the subscriber can open a new one.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use mbot_console_core::{ChannelId, MapSnapshot, SlamMode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

use crate::client::{ChannelClient, ClientError, MessageHandler, StreamEvent};
use crate::config::ChannelNames;

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    result: Option<Value>,
    error: Option<BridgeFailure>,
}

#[derive(Debug, Deserialize)]
struct BridgeFailure {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BridgePush {
    data: Value,
}

#[derive(Debug, Deserialize)]
struct ChannelEntry {
    channel: String,
}

/// Parse one response line. Extracted for unit testing.
fn parse_response(line: &str) -> Result<Value, ClientError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ClientError::Protocol(
            "connection closed before response".to_string(),
        ));
    }
    let resp: BridgeResponse = serde_json::from_str(line)?;
    if let Some(err) = resp.error {
        return Err(ClientError::Remote(err.message));
    }
    Ok(resp.result.unwrap_or(Value::Null))
}

async fn write_request(
    writer: &mut OwnedWriteHalf,
    method: &str,
    params: Value,
) -> Result<(), ClientError> {
    let request = json!({ "method": method, "params": params });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    writer.write_all(req.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

pub struct BridgeClient {
    address: String,
    names: ChannelNames,
    timeout: Duration,
    streams: Mutex<HashMap<ChannelId, JoinHandle<()>>>,
}

impl BridgeClient {
    pub fn new(address: impl Into<String>, names: ChannelNames, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            names,
            timeout,
            streams: Mutex::new(HashMap::new()),
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let call = async {
            let stream = TcpStream::connect(&self.address).await?;
            let (reader, mut writer) = stream.into_split();
            write_request(&mut writer, method, params).await?;
            writer.shutdown().await?;

            let mut reader = BufReader::new(reader);
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            parse_response(&line)
        };
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout_ms()))?
    }

    async fn open_stream(
        &self,
        wire_name: &str,
    ) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf), ClientError> {
        let open = async {
            let stream = TcpStream::connect(&self.address).await?;
            let (reader, mut writer) = stream.into_split();
            write_request(&mut writer, "subscribe", json!({ "channel": wire_name })).await?;

            let mut reader = BufReader::new(reader);
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            parse_response(&line)?;
            Ok::<_, ClientError>((reader, writer))
        };
        tokio::time::timeout(self.timeout, open)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout_ms()))?
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        let streams = self.streams.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in streams.drain() {
            task.abort();
        }
    }
}

/// Forward pushed lines to `handler` until the bridge closes the stream,
/// then report the close.
async fn pump_stream(
    channel: ChannelId,
    mut reader: BufReader<OwnedReadHalf>,
    // Held so the connection stays open for the life of the subscription.
    _writer: OwnedWriteHalf,
    handler: MessageHandler,
) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                tracing::debug!("{channel} stream closed by bridge");
                break;
            }
            Ok(_) => match serde_json::from_str::<BridgePush>(line.trim()) {
                Ok(push) => handler(StreamEvent::Message(push.data)),
                Err(e) => tracing::warn!("dropping malformed {channel} push: {e}"),
            },
            Err(e) => {
                tracing::warn!("{channel} stream read failed: {e}");
                break;
            }
        }
    }
    handler(StreamEvent::Closed);
}

impl ChannelClient for BridgeClient {
    async fn subscribe(&self, channel: ChannelId, handler: MessageHandler) -> Result<(), ClientError> {
        let wire_name = self.names.name(channel).to_string();
        let (reader, writer) = self.open_stream(&wire_name).await?;
        let task = tokio::spawn(pump_stream(channel, reader, writer, handler));

        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = streams.insert(channel, task) {
            previous.abort();
        }
        tracing::debug!("subscribed to {channel} ({wire_name})");
        Ok(())
    }

    async fn unsubscribe(&self, channel: ChannelId) -> Result<(), ClientError> {
        let task = self
            .streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&channel);
        match task {
            Some(task) => {
                task.abort();
                tracing::debug!("unsubscribed from {channel}");
                Ok(())
            }
            None => Err(ClientError::NotSubscribed(channel)),
        }
    }

    async fn list_active_channels(&self) -> Result<Vec<ChannelId>, ClientError> {
        let result = self.request("channels", json!({})).await?;
        let entries: Vec<ChannelEntry> = serde_json::from_value(result)?;
        Ok(entries
            .iter()
            .filter_map(|entry| self.names.resolve(&entry.channel))
            .collect())
    }

    async fn read_map(&self) -> Result<MapSnapshot, ClientError> {
        let result = self.request("map", json!({})).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn read_hostname(&self) -> Result<String, ClientError> {
        match self.request("hostname", json!({})).await? {
            Value::String(name) => Ok(name),
            other => Err(ClientError::Protocol(format!(
                "hostname is not a string: {other}"
            ))),
        }
    }

    async fn reset_slam(&self, mode: SlamMode, clear_map: bool) -> Result<(), ClientError> {
        self.request(
            "reset_slam",
            json!({ "slam_mode": mode.code(), "clear_map": clear_map }),
        )
        .await?;
        Ok(())
    }
}
