use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Channels ─────────────────────────────────────────────────────

/// Logical telemetry channel. Wire names are configured in the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    Pose,
    Lidar,
    Particle,
    Path,
    SlamMode,
    SlamMap,
}

impl ChannelId {
    pub const ALL: [Self; 6] = [
        Self::Pose,
        Self::Lidar,
        Self::Particle,
        Self::Path,
        Self::SlamMode,
        Self::SlamMap,
    ];

    /// Channels that push messages and can carry a subscription.
    ///
    /// `SlamMap` is tracked for availability only; the map itself is
    /// pulled with an explicit read.
    pub const SUBSCRIBABLE: [Self; 5] = [
        Self::Pose,
        Self::Lidar,
        Self::Particle,
        Self::Path,
        Self::SlamMode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pose => "pose",
            Self::Lidar => "lidar",
            Self::Particle => "particle",
            Self::Path => "path",
            Self::SlamMode => "slam_mode",
            Self::SlamMap => "slam_map",
        }
    }

    pub fn is_subscribable(self) -> bool {
        self != Self::SlamMap
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "pose" => Ok(Self::Pose),
            "lidar" => Ok(Self::Lidar),
            "particle" => Ok(Self::Particle),
            "path" => Ok(Self::Path),
            "slam_mode" => Ok(Self::SlamMode),
            "slam_map" => Ok(Self::SlamMap),
            _ => Err(CoreError::UnknownChannel(s.to_string())),
        }
    }
}

// ─── SLAM mode ────────────────────────────────────────────────────

/// Mapping mode reported by (and requested from) the robot.
///
/// Serialized as the integer code used on the `SLAM_MODE` channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum SlamMode {
    /// No `SLAM_MODE` message received yet.
    #[default]
    Invalid,
    Idle,
    LocalizationOnly,
    FullSlam,
}

impl SlamMode {
    pub const fn code(self) -> i64 {
        match self {
            Self::Invalid => -1,
            Self::LocalizationOnly => 2,
            Self::FullSlam => 3,
            Self::Idle => 99,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, CoreError> {
        match code {
            -1 => Ok(Self::Invalid),
            2 => Ok(Self::LocalizationOnly),
            3 => Ok(Self::FullSlam),
            99 => Ok(Self::Idle),
            other => Err(CoreError::UnknownSlamMode(other)),
        }
    }

    /// Whether the console should be fetching the map in this mode.
    ///
    /// `LocalizationOnly` needs the map once, `FullSlam` needs it
    /// continuously; the scheduler decides the cadence.
    pub fn requests_map(self) -> bool {
        matches!(self, Self::LocalizationOnly | Self::FullSlam)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Idle => "idle",
            Self::LocalizationOnly => "localization_only",
            Self::FullSlam => "full_slam",
        }
    }
}

impl fmt::Display for SlamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i64> for SlamMode {
    type Error = CoreError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<SlamMode> for i64 {
    fn from(mode: SlamMode) -> Self {
        mode.code()
    }
}

// ─── Pose & grid ──────────────────────────────────────────────────

/// Latest known robot pose in the world frame (meters, radians).
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotPose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

/// Discretized map coordinate. Only meaningful while a map is loaded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub row: i32,
    pub col: i32,
}

/// The operator's current map selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickedCell {
    pub cell: GridCell,
    pub world_pos: (f64, f64),
}

// ─── Map ──────────────────────────────────────────────────────────

/// Geometry of an occupancy grid, without the cell payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapHeader {
    pub width: u32,
    pub height: u32,
    pub meters_per_cell: f64,
    pub origin: (f64, f64),
}

/// A full occupancy grid as read from the robot.
///
/// Immutable once fetched; a newer fetch replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub width: u32,
    pub height: u32,
    pub meters_per_cell: f64,
    pub origin: (f64, f64),
    /// Row-major log-odds occupancy, `width * height` entries.
    pub cells: Vec<i8>,
}

impl MapSnapshot {
    pub fn header(&self) -> MapHeader {
        MapHeader {
            width: self.width,
            height: self.height,
            meters_per_cell: self.meters_per_cell,
            origin: self.origin,
        }
    }

    pub fn expected_cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reject snapshots whose payload does not match the header.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.meters_per_cell <= 0.0 || !self.meters_per_cell.is_finite() {
            return Err(CoreError::InvalidResolution(self.meters_per_cell));
        }
        let expected = self.expected_cells();
        if self.cells.len() != expected {
            return Err(CoreError::MapSize {
                expected,
                actual: self.cells.len(),
            });
        }
        Ok(())
    }
}

// ─── Errors ───────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("unknown slam mode code: {0}")]
    UnknownSlamMode(i64),

    #[error("malformed {channel} message: {detail}")]
    MalformedMessage { channel: ChannelId, detail: String },

    #[error("channel {0} does not carry pushed messages")]
    NotSubscribable(ChannelId),

    #[error("map payload has {actual} cells, header expects {expected}")]
    MapSize { expected: usize, actual: usize },

    #[error("invalid map resolution: {0} m/cell")]
    InvalidResolution(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_display_and_parse() {
        for ch in ChannelId::ALL {
            let parsed = ch.to_string().parse::<ChannelId>().expect("parse");
            assert_eq!(ch, parsed);
        }
        assert_eq!(
            "slam-mode".parse::<ChannelId>().expect("dash form"),
            ChannelId::SlamMode
        );
        assert!("odometry".parse::<ChannelId>().is_err());
    }

    #[test]
    fn slam_map_is_not_subscribable() {
        assert!(!ChannelId::SlamMap.is_subscribable());
        assert!(!ChannelId::SUBSCRIBABLE.contains(&ChannelId::SlamMap));
        assert!(ChannelId::SUBSCRIBABLE.iter().all(|c| c.is_subscribable()));
    }

    #[test]
    fn slam_mode_uses_wire_codes() {
        assert_eq!(serde_json::to_string(&SlamMode::FullSlam).expect("ser"), "3");
        assert_eq!(serde_json::to_string(&SlamMode::Idle).expect("ser"), "99");
        let mode: SlamMode = serde_json::from_str("2").expect("de");
        assert_eq!(mode, SlamMode::LocalizationOnly);
        assert!(serde_json::from_str::<SlamMode>("0").is_err());
    }

    #[test]
    fn slam_mode_default_is_invalid() {
        assert_eq!(SlamMode::default(), SlamMode::Invalid);
    }

    #[test]
    fn requests_map_only_when_localizing_or_mapping() {
        assert!(!SlamMode::Invalid.requests_map());
        assert!(!SlamMode::Idle.requests_map());
        assert!(SlamMode::LocalizationOnly.requests_map());
        assert!(SlamMode::FullSlam.requests_map());
    }

    #[test]
    fn snapshot_validate_checks_payload_size() {
        let mut snap = MapSnapshot {
            width: 3,
            height: 2,
            meters_per_cell: 0.05,
            origin: (-1.0, -1.0),
            cells: vec![0; 6],
        };
        assert!(snap.validate().is_ok());

        snap.cells.pop();
        let err = snap.validate().expect_err("short payload");
        assert!(err.to_string().contains("5 cells"));
    }

    #[test]
    fn snapshot_validate_rejects_zero_resolution() {
        let snap = MapSnapshot {
            width: 1,
            height: 1,
            meters_per_cell: 0.0,
            origin: (0.0, 0.0),
            cells: vec![0],
        };
        assert!(matches!(
            snap.validate(),
            Err(CoreError::InvalidResolution(_))
        ));
    }

    #[test]
    fn snapshot_deserializes_from_bridge_json() {
        let json = r#"{"width":2,"height":1,"meters_per_cell":0.1,"origin":[0.5,-0.5],"cells":[-10,100]}"#;
        let snap: MapSnapshot = serde_json::from_str(json).expect("deserialize");
        assert_eq!(snap.header().origin, (0.5, -0.5));
        assert_eq!(snap.cells, vec![-10, 100]);
    }
}
