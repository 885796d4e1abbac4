//! Map polling scheduler.
//!
//! - `FULL_SLAM`: fetch now, then every period, on a timer created fresh on
//!   each entry.
//! - `LOCALIZATION_ONLY`: fetch once on entry.
//! - `IDLE` / `INVALID`: nothing; any timer is dropped.
//!
//! The scheduler only says when a fetch is due; [`fetch_map`] performs it.

use std::time::Duration;

use mbot_console_core::{MapSnapshot, SlamMode};
use tokio::time::{Interval, MissedTickBehavior, interval};

use crate::client::ChannelClient;
use crate::scene::Scene;

pub struct MapPollingScheduler {
    period: Duration,
    mode: SlamMode,
    timer: Option<Interval>,
    one_shot_pending: bool,
}

impl MapPollingScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            mode: SlamMode::Invalid,
            timer: None,
            one_shot_pending: false,
        }
    }

    pub fn mode(&self) -> SlamMode {
        self.mode
    }

    pub fn is_recurring(&self) -> bool {
        self.timer.is_some()
    }

    /// React to a mode change. Re-announcing the current mode does nothing.
    pub fn on_mode_change(&mut self, mode: SlamMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.timer = None;
        self.one_shot_pending = false;

        match mode {
            SlamMode::FullSlam => {
                let mut timer = interval(self.period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.timer = Some(timer);
                tracing::debug!("map polling every {:?}", self.period);
            }
            SlamMode::LocalizationOnly => {
                self.one_shot_pending = true;
                tracing::debug!("single map fetch scheduled");
            }
            SlamMode::Idle | SlamMode::Invalid => tracing::debug!("map polling stopped"),
        }
    }

    /// Drop any pending fetch and forget the mode.
    pub fn cancel(&mut self) {
        self.mode = SlamMode::Invalid;
        self.timer = None;
        self.one_shot_pending = false;
    }

    /// Resolves when a fetch is due. Never resolves while nothing is
    /// scheduled. Cancel-safe.
    pub async fn due(&mut self) {
        if self.one_shot_pending {
            self.one_shot_pending = false;
            return;
        }
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Read the map and hand it to the scene.
///
/// Failures and inconsistent snapshots are logged and discarded so the
/// previous map stays on screen.
pub async fn fetch_map(client: &impl ChannelClient, scene: &mut impl Scene) -> Option<MapSnapshot> {
    let snapshot = match client.read_map().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("error reading map: {e}");
            return None;
        }
    };
    if let Err(e) = snapshot.validate() {
        tracing::warn!("discarding map: {e}");
        return None;
    }
    scene.set_map_header_data(&snapshot.header());
    scene.update_cells(&snapshot.cells);
    tracing::debug!("map updated ({}x{})", snapshot.width, snapshot.height);
    Some(snapshot)
}
