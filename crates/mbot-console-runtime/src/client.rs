//! ChannelClient trait: the robot transport boundary.
//! Mock-injectable so the console logic is testable without a bridge.

use std::future::Future;
use std::sync::Arc;

use mbot_console_core::{ChannelId, MapSnapshot, SlamMode};
use thiserror::Error;

/// What a subscription delivers to its handler.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// One message pushed on the channel.
    Message(serde_json::Value),
    /// The stream ended without being unsubscribed. Nothing follows.
    Closed,
}

/// Callback invoked once per event on a subscribed channel.
pub type MessageHandler = Arc<dyn Fn(StreamEvent) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("bridge io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bridge request timed out after {0} ms")]
    Timeout(u64),

    #[error("bridge protocol error: {0}")]
    Protocol(String),

    #[error("bridge rejected request: {0}")]
    Remote(String),

    #[error("bridge payload decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no active subscription for channel {0}")]
    NotSubscribed(ChannelId),
}

/// Primitives offered by the robot bridge.
///
/// Every call may fail with a [`ClientError`]; callers log and carry on.
pub trait ChannelClient {
    fn subscribe(
        &self,
        channel: ChannelId,
        handler: MessageHandler,
    ) -> impl Future<Output = Result<(), ClientError>>;

    fn unsubscribe(&self, channel: ChannelId) -> impl Future<Output = Result<(), ClientError>>;

    fn list_active_channels(&self) -> impl Future<Output = Result<Vec<ChannelId>, ClientError>>;

    fn read_map(&self) -> impl Future<Output = Result<MapSnapshot, ClientError>>;

    fn read_hostname(&self) -> impl Future<Output = Result<String, ClientError>>;

    fn reset_slam(
        &self,
        mode: SlamMode,
        clear_map: bool,
    ) -> impl Future<Output = Result<(), ClientError>>;
}
