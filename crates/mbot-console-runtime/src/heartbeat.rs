//! Connectivity monitor: periodic channel listing feeding [`ConnectivityState`].

use std::time::Duration;

use mbot_console_core::{ChannelId, ConnectivityChange, ConnectivityState};
use tokio::time::{Interval, MissedTickBehavior, interval};

use crate::client::ChannelClient;

/// Sole writer of the connectivity state.
pub struct ConnectivityMonitor {
    period: Duration,
    state: ConnectivityState,
}

impl ConnectivityMonitor {
    pub fn new(period: Duration, tracked: &[ChannelId]) -> Self {
        Self {
            period,
            state: ConnectivityState::new(tracked),
        }
    }

    pub fn state(&self) -> &ConnectivityState {
        &self.state
    }

    /// Heartbeat timer. The first tick completes immediately.
    pub fn ticker(&self) -> Interval {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// Run one heartbeat and return the flags that flipped.
    pub async fn poll(&mut self, client: &impl ChannelClient) -> ConnectivityChange {
        let change = match client.list_active_channels().await {
            Ok(live) => self.state.apply_success(&live),
            Err(e) => {
                if self.state.connected() || !self.state.heartbeat_seen() {
                    tracing::warn!("heartbeat failed: {e}");
                } else {
                    tracing::debug!("heartbeat failed: {e}");
                }
                self.state.apply_failure()
            }
        };

        match change.connected {
            Some(true) if change.reconnected => tracing::info!("bridge reconnected"),
            Some(true) => tracing::info!("bridge connected"),
            Some(false) => tracing::info!("bridge connection lost"),
            None => {}
        }
        for (channel, available) in &change.availability {
            tracing::info!(
                "channel {channel} {}",
                if *available { "available" } else { "gone" }
            );
        }
        change
    }
}
