//! Heartbeat-derived connectivity state.
//!
//! Pure transition functions; the runtime's monitor performs the actual
//! channel listing and feeds the outcome here. Only flag transitions are
//! reported back, so an unchanged poll produces an empty
//! [`ConnectivityChange`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::ChannelId;

/// Connection flag plus per-channel availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityState {
    connected: bool,
    /// True once any heartbeat result (success or failure) has arrived.
    heartbeat_seen: bool,
    /// True once any heartbeat has succeeded in this process.
    ever_connected: bool,
    availability: BTreeMap<ChannelId, bool>,
}

/// Flags that flipped during one heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityChange {
    /// New value of `connected`, if it changed.
    pub connected: Option<bool>,
    /// Channels whose availability flipped, with the new value.
    pub availability: Vec<(ChannelId, bool)>,
    /// Connection came back after having been lost.
    pub reconnected: bool,
}

impl ConnectivityChange {
    pub fn is_empty(&self) -> bool {
        self.connected.is_none() && self.availability.is_empty()
    }
}

impl ConnectivityState {
    /// Track the given channels; all start unavailable and disconnected.
    pub fn new(tracked: &[ChannelId]) -> Self {
        Self {
            connected: false,
            heartbeat_seen: false,
            ever_connected: false,
            availability: tracked.iter().map(|&ch| (ch, false)).collect(),
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn heartbeat_seen(&self) -> bool {
        self.heartbeat_seen
    }

    /// Availability of a tracked channel. Untracked channels are unavailable.
    pub fn is_available(&self, channel: ChannelId) -> bool {
        self.availability.get(&channel).copied().unwrap_or(false)
    }

    pub fn availability(&self) -> &BTreeMap<ChannelId, bool> {
        &self.availability
    }

    /// Apply a successful heartbeat that listed `live` channels.
    pub fn apply_success(&mut self, live: &[ChannelId]) -> ConnectivityChange {
        let mut change = ConnectivityChange::default();
        self.heartbeat_seen = true;

        if !self.connected {
            self.connected = true;
            change.connected = Some(true);
            change.reconnected = self.ever_connected;
        }
        self.ever_connected = true;

        for (&channel, available) in self.availability.iter_mut() {
            let has_data = live.contains(&channel);
            if has_data != *available {
                *available = has_data;
                change.availability.push((channel, has_data));
            }
        }
        change
    }

    /// Apply a failed heartbeat.
    ///
    /// Availability is left as last known: a missed heartbeat says nothing
    /// about whether the channels themselves went away.
    pub fn apply_failure(&mut self) -> ConnectivityChange {
        let mut change = ConnectivityChange::default();
        self.heartbeat_seen = true;
        if self.connected {
            self.connected = false;
            change.connected = Some(false);
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked() -> ConnectivityState {
        ConnectivityState::new(&ChannelId::ALL)
    }

    #[test]
    fn initial_state_is_disconnected_and_unseen() {
        let st = tracked();
        assert!(!st.connected());
        assert!(!st.heartbeat_seen());
        assert!(ChannelId::ALL.iter().all(|&c| !st.is_available(c)));
    }

    #[test]
    fn pose_and_slam_mode_listed() {
        let mut st = tracked();
        let change = st.apply_success(&[ChannelId::Pose, ChannelId::SlamMode]);

        assert!(st.connected());
        assert!(st.is_available(ChannelId::Pose));
        assert!(st.is_available(ChannelId::SlamMode));
        assert!(!st.is_available(ChannelId::Lidar));
        assert_eq!(change.connected, Some(true));
        assert!(!change.reconnected);
        assert_eq!(
            change.availability,
            vec![(ChannelId::Pose, true), (ChannelId::SlamMode, true)]
        );
    }

    #[test]
    fn unchanged_poll_reports_nothing() {
        let mut st = tracked();
        st.apply_success(&[ChannelId::Pose]);
        let change = st.apply_success(&[ChannelId::Pose]);
        assert!(change.is_empty());
    }

    #[test]
    fn failure_keeps_availability() {
        let mut st = tracked();
        st.apply_success(&[ChannelId::Pose, ChannelId::Lidar]);
        let change = st.apply_failure();

        assert!(!st.connected());
        assert_eq!(change.connected, Some(false));
        assert!(change.availability.is_empty());
        assert!(st.is_available(ChannelId::Pose));
        assert!(st.is_available(ChannelId::Lidar));
    }

    #[test]
    fn repeated_failure_reports_once() {
        let mut st = tracked();
        st.apply_success(&[]);
        assert_eq!(st.apply_failure().connected, Some(false));
        assert!(st.apply_failure().is_empty());
    }

    #[test]
    fn first_failure_marks_heartbeat_seen_without_change() {
        let mut st = tracked();
        let change = st.apply_failure();
        assert!(change.is_empty());
        assert!(st.heartbeat_seen());
    }

    #[test]
    fn reconnect_after_loss_is_flagged() {
        let mut st = tracked();
        st.apply_success(&[ChannelId::Pose]);
        st.apply_failure();
        let change = st.apply_success(&[]);

        assert_eq!(change.connected, Some(true));
        assert!(change.reconnected);
        assert_eq!(change.availability, vec![(ChannelId::Pose, false)]);
    }

    #[test]
    fn channel_disappearing_is_reported() {
        let mut st = tracked();
        st.apply_success(&[ChannelId::Particle]);
        let change = st.apply_success(&[ChannelId::Lidar]);
        assert_eq!(
            change.availability,
            vec![(ChannelId::Lidar, true), (ChannelId::Particle, false)]
        );
        assert!(change.connected.is_none());
    }

    #[test]
    fn connected_tracks_most_recent_poll() {
        // Arbitrary success/failure sequence: `connected` always mirrors the
        // last result and availability mirrors the last successful listing.
        let polls: [Option<&[ChannelId]>; 6] = [
            Some(&[ChannelId::Pose][..]),
            None,
            None,
            Some(&[ChannelId::Path, ChannelId::SlamMap][..]),
            None,
            Some(&[][..]),
        ];
        let mut st = tracked();
        let mut last_ok: &[ChannelId] = &[];
        for poll in polls {
            match poll {
                Some(live) => {
                    st.apply_success(live);
                    last_ok = live;
                }
                None => {
                    st.apply_failure();
                }
            }
            assert_eq!(st.connected(), poll.is_some());
            for ch in ChannelId::ALL {
                assert_eq!(st.is_available(ch), last_ok.contains(&ch));
            }
        }
    }
}
