//! Test doubles shared by the runtime's unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use mbot_console_core::{ChannelId, MapSnapshot, SlamMode};
use serde_json::Value;

use crate::client::{ChannelClient, ClientError, MessageHandler, StreamEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Subscribe(ChannelId),
    Unsubscribe(ChannelId),
    ListChannels,
    ReadMap,
    ReadHostname,
    ResetSlam(SlamMode, bool),
}

/// Recording in-memory ChannelClient.
///
/// Listing, map, and hostname answers are configurable; `None` makes the
/// call fail. Subscribed handlers are kept so tests can push payloads.
pub struct FakeClient {
    calls: RefCell<Vec<Call>>,
    live: RefCell<Option<Vec<ChannelId>>>,
    map: RefCell<Option<MapSnapshot>>,
    hostname: RefCell<Option<String>>,
    failing_subscribes: RefCell<BTreeSet<ChannelId>>,
    fail_reset: Cell<bool>,
    handlers: RefCell<BTreeMap<ChannelId, MessageHandler>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            live: RefCell::new(Some(Vec::new())),
            map: RefCell::new(None),
            hostname: RefCell::new(Some("mbot-test".to_string())),
            failing_subscribes: RefCell::new(BTreeSet::new()),
            fail_reset: Cell::new(false),
            handlers: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn set_live(&self, channels: &[ChannelId]) {
        *self.live.borrow_mut() = Some(channels.to_vec());
    }

    pub fn fail_listing(&self) {
        *self.live.borrow_mut() = None;
    }

    pub fn set_map(&self, map: Option<MapSnapshot>) {
        *self.map.borrow_mut() = map;
    }

    pub fn set_hostname(&self, hostname: Option<&str>) {
        *self.hostname.borrow_mut() = hostname.map(str::to_string);
    }

    pub fn fail_subscribe(&self, channel: ChannelId) {
        self.failing_subscribes.borrow_mut().insert(channel);
    }

    pub fn allow_subscribe(&self, channel: ChannelId) {
        self.failing_subscribes.borrow_mut().remove(&channel);
    }

    pub fn fail_reset(&self, fail: bool) {
        self.fail_reset.set(fail);
    }

    /// Deliver a payload to the handler subscribed on `channel`, if any.
    pub fn push(&self, channel: ChannelId, payload: Value) {
        self.deliver(channel, StreamEvent::Message(payload));
    }

    /// End the stream on `channel` as the bridge would.
    pub fn close(&self, channel: ChannelId) {
        self.deliver(channel, StreamEvent::Closed);
    }

    fn deliver(&self, channel: ChannelId, event: StreamEvent) {
        let handler = self.handlers.borrow().get(&channel).cloned();
        if let Some(handler) = handler {
            handler(event);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    /// Calls other than heartbeat listings.
    pub fn commands(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| **c != Call::ListChannels)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn refused() -> ClientError {
    ClientError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))
}

impl ChannelClient for FakeClient {
    async fn subscribe(&self, channel: ChannelId, handler: MessageHandler) -> Result<(), ClientError> {
        self.record(Call::Subscribe(channel));
        if self.failing_subscribes.borrow().contains(&channel) {
            return Err(ClientError::Remote(format!("cannot subscribe to {channel}")));
        }
        self.handlers.borrow_mut().insert(channel, handler);
        Ok(())
    }

    async fn unsubscribe(&self, channel: ChannelId) -> Result<(), ClientError> {
        self.record(Call::Unsubscribe(channel));
        match self.handlers.borrow_mut().remove(&channel) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotSubscribed(channel)),
        }
    }

    async fn list_active_channels(&self) -> Result<Vec<ChannelId>, ClientError> {
        self.record(Call::ListChannels);
        self.live.borrow().clone().ok_or_else(refused)
    }

    async fn read_map(&self) -> Result<MapSnapshot, ClientError> {
        self.record(Call::ReadMap);
        self.map.borrow().clone().ok_or_else(refused)
    }

    async fn read_hostname(&self) -> Result<String, ClientError> {
        self.record(Call::ReadHostname);
        self.hostname.borrow().clone().ok_or_else(refused)
    }

    async fn reset_slam(&self, mode: SlamMode, clear_map: bool) -> Result<(), ClientError> {
        self.record(Call::ResetSlam(mode, clear_map));
        if self.fail_reset.get() {
            return Err(refused());
        }
        Ok(())
    }
}

/// A `width` x `height` map of 0.1 m cells with its origin at (0, 0).
pub fn map_snapshot(width: u32, height: u32) -> MapSnapshot {
    MapSnapshot {
        width,
        height,
        meters_per_cell: 0.1,
        origin: (0.0, 0.0),
        cells: vec![0; width as usize * height as usize],
    }
}
