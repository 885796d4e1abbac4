//! Typed payloads for the pushed telemetry channels.
//!
//! The transport hands over one JSON value per message; [`decode`] turns it
//! into a [`Telemetry`] according to the channel it arrived on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ChannelId, CoreError, RobotPose, SlamMode};

/// One lidar sweep: parallel range and bearing arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarScan {
    pub ranges: Vec<f64>,
    pub thetas: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticlePose {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub theta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub pose: ParticlePose,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSet {
    pub particles: Vec<Particle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPath {
    pub path: Vec<RobotPose>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlamStatus {
    pub slam_mode: SlamMode,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
    Pose(RobotPose),
    Lidar(LidarScan),
    Particles(ParticleSet),
    Path(PlannedPath),
    SlamMode(SlamMode),
}

impl Telemetry {
    pub fn channel(&self) -> ChannelId {
        match self {
            Self::Pose(_) => ChannelId::Pose,
            Self::Lidar(_) => ChannelId::Lidar,
            Self::Particles(_) => ChannelId::Particle,
            Self::Path(_) => ChannelId::Path,
            Self::SlamMode(_) => ChannelId::SlamMode,
        }
    }
}

/// Decode a raw payload received on `channel`.
pub fn decode(channel: ChannelId, payload: Value) -> Result<Telemetry, CoreError> {
    let malformed = |e: serde_json::Error| CoreError::MalformedMessage {
        channel,
        detail: e.to_string(),
    };
    match channel {
        ChannelId::Pose => serde_json::from_value(payload)
            .map(Telemetry::Pose)
            .map_err(malformed),
        ChannelId::Lidar => serde_json::from_value(payload)
            .map(Telemetry::Lidar)
            .map_err(malformed),
        ChannelId::Particle => serde_json::from_value(payload)
            .map(Telemetry::Particles)
            .map_err(malformed),
        ChannelId::Path => serde_json::from_value(payload)
            .map(Telemetry::Path)
            .map_err(malformed),
        ChannelId::SlamMode => serde_json::from_value::<SlamStatus>(payload)
            .map(|s| Telemetry::SlamMode(s.slam_mode))
            .map_err(malformed),
        ChannelId::SlamMap => Err(CoreError::NotSubscribable(channel)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_pose() {
        let t = decode(ChannelId::Pose, json!({"x": 1.5, "y": -2.0, "theta": 0.25}))
            .expect("pose");
        assert_eq!(
            t,
            Telemetry::Pose(RobotPose {
                x: 1.5,
                y: -2.0,
                theta: 0.25
            })
        );
        assert_eq!(t.channel(), ChannelId::Pose);
    }

    #[test]
    fn decode_pose_ignores_extra_fields() {
        let t = decode(
            ChannelId::Pose,
            json!({"utime": 123, "x": 0.0, "y": 0.0, "theta": 0.0}),
        );
        assert!(t.is_ok());
    }

    #[test]
    fn decode_particles_without_weights() {
        let t = decode(
            ChannelId::Particle,
            json!({"particles": [{"pose": {"x": 1.0, "y": 2.0}}, {"pose": {"x": 3.0, "y": 4.0}}]}),
        )
        .expect("particles");
        let Telemetry::Particles(set) = t else {
            panic!("expected particles");
        };
        assert_eq!(set.particles.len(), 2);
        assert_eq!(set.particles[1].pose.x, 3.0);
    }

    #[test]
    fn decode_slam_status_code() {
        let t = decode(ChannelId::SlamMode, json!({"slam_mode": 99})).expect("status");
        assert_eq!(t, Telemetry::SlamMode(SlamMode::Idle));
    }

    #[test]
    fn decode_unknown_slam_code_is_malformed() {
        let err = decode(ChannelId::SlamMode, json!({"slam_mode": 0})).expect_err("bad code");
        assert!(matches!(
            err,
            CoreError::MalformedMessage {
                channel: ChannelId::SlamMode,
                ..
            }
        ));
    }

    #[test]
    fn decode_lidar_missing_field_is_malformed() {
        let err = decode(ChannelId::Lidar, json!({"ranges": [1.0]})).expect_err("no thetas");
        assert!(err.to_string().contains("lidar"));
    }

    #[test]
    fn decode_map_channel_is_rejected() {
        assert!(matches!(
            decode(ChannelId::SlamMap, json!({})),
            Err(CoreError::NotSubscribable(ChannelId::SlamMap))
        ));
    }
}
