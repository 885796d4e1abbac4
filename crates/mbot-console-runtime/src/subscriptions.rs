//! Subscription manager: diff desired against active, call only what changed.
//!
//! Handlers never touch console state directly. Each one forwards its
//! payload, tagged with the channel, into the console's inbound queue; the
//! event loop drains that queue on its own task. Per-channel publish order
//! is kept because each stream pushes into the same FIFO in arrival order.
//!
//! A stream the bridge closes on its own is marked lost; the channel leaves
//! the active set and the next reconcile subscribes it again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use mbot_console_core::ChannelId;
use tokio::sync::mpsc;

use crate::client::{ChannelClient, MessageHandler, StreamEvent};

/// An event from the robot on a subscribed channel.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub channel: ChannelId,
    pub event: StreamEvent,
}

/// Sole writer of the active subscription set.
pub struct SubscriptionManager {
    inbound: mpsc::UnboundedSender<InboundMessage>,
    active: BTreeSet<ChannelId>,
    lost: BTreeSet<ChannelId>,
}

impl SubscriptionManager {
    pub fn new(inbound: mpsc::UnboundedSender<InboundMessage>) -> Self {
        Self {
            inbound,
            active: BTreeSet::new(),
            lost: BTreeSet::new(),
        }
    }

    pub fn is_active(&self, channel: ChannelId) -> bool {
        self.active.contains(&channel)
    }

    pub fn active(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.active.iter().copied()
    }

    fn handler(&self, channel: ChannelId) -> MessageHandler {
        let tx = self.inbound.clone();
        Arc::new(move |event| {
            // Receiver gone means the console is shutting down.
            let _ = tx.send(InboundMessage { channel, event });
        })
    }

    /// Record that the stream for `channel` ended on its own. Returns
    /// false when the channel was not active.
    pub fn stream_closed(&mut self, channel: ChannelId) -> bool {
        if !self.active.remove(&channel) {
            return false;
        }
        self.lost.insert(channel);
        true
    }

    /// Whether a stream was lost since the last reconcile.
    pub fn needs_reconcile(&self) -> bool {
        !self.lost.is_empty()
    }

    /// Bring the active set in line with `desired`. Missing entries count
    /// as not desired.
    ///
    /// A failed subscribe leaves the channel inactive; the next reconcile
    /// tries again. A failed unsubscribe is logged and the channel is
    /// dropped from the active set regardless.
    pub async fn reconcile(
        &mut self,
        client: &impl ChannelClient,
        desired: &BTreeMap<ChannelId, bool>,
    ) {
        self.lost.clear();
        for channel in ChannelId::SUBSCRIBABLE {
            let want = desired.get(&channel).copied().unwrap_or(false);
            let have = self.active.contains(&channel);
            match (want, have) {
                (true, false) => match client.subscribe(channel, self.handler(channel)).await {
                    Ok(()) => {
                        tracing::debug!("subscribed to {channel}");
                        self.active.insert(channel);
                    }
                    Err(e) => tracing::warn!("subscription failed for {channel}: {e}"),
                },
                (false, true) => {
                    self.active.remove(&channel);
                    match client.unsubscribe(channel).await {
                        Ok(()) => tracing::debug!("unsubscribed from {channel}"),
                        Err(e) => tracing::warn!("unsubscribe failed for {channel}: {e}"),
                    }
                }
                _ => {}
            }
        }
    }

    /// Unregister every active subscription exactly once.
    pub async fn teardown(&mut self, client: &impl ChannelClient) {
        self.lost.clear();
        for channel in std::mem::take(&mut self.active) {
            if let Err(e) = client.unsubscribe(channel).await {
                tracing::warn!("unsubscribe failed for {channel}: {e}");
            }
        }
    }
}
