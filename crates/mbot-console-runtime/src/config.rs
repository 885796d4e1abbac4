//! Console settings: TOML file with per-field defaults, then CLI overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mbot_console_core::ChannelId;
use mbot_console_core::status::DisplayToggles;
use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} must be greater than zero")]
    ZeroPeriod(&'static str),

    #[error("scene.pixels_per_meter must be a positive number, got {0}")]
    InvalidScale(f64),

    #[error("duplicate wire name {0:?} in [channels]")]
    DuplicateChannelName(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bridge: BridgeSettings,
    pub timing: TimingSettings,
    pub channels: ChannelNames,
    pub display: DisplaySettings,
    pub scene: SceneSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub address: String,
    pub request_timeout_ms: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5005".to_string(),
            request_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub heartbeat_period_ms: u64,
    pub map_poll_period_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            heartbeat_period_ms: 500,
            map_poll_period_ms: 2_000,
        }
    }
}

/// Wire names of the robot's channels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChannelNames {
    pub pose: String,
    pub lidar: String,
    pub particle: String,
    pub path: String,
    pub slam_mode: String,
    pub slam_map: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            pose: "SLAM_POSE".to_string(),
            lidar: "LIDAR".to_string(),
            particle: "SLAM_PARTICLES".to_string(),
            path: "CONTROLLER_PATH".to_string(),
            slam_mode: "SLAM_STATUS".to_string(),
            slam_map: "SLAM_MAP".to_string(),
        }
    }
}

impl ChannelNames {
    pub fn name(&self, channel: ChannelId) -> &str {
        match channel {
            ChannelId::Pose => &self.pose,
            ChannelId::Lidar => &self.lidar,
            ChannelId::Particle => &self.particle,
            ChannelId::Path => &self.path,
            ChannelId::SlamMode => &self.slam_mode,
            ChannelId::SlamMap => &self.slam_map,
        }
    }

    /// Map a wire name back to its channel. Unknown names are `None`.
    pub fn resolve(&self, wire_name: &str) -> Option<ChannelId> {
        ChannelId::ALL
            .into_iter()
            .find(|&ch| self.name(ch) == wire_name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub robot: bool,
    pub lasers: bool,
    pub particles: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        let toggles = DisplayToggles::default();
        Self {
            robot: toggles.robot,
            lasers: toggles.lasers,
            particles: toggles.particles,
        }
    }
}

impl DisplaySettings {
    pub fn toggles(&self) -> DisplayToggles {
        DisplayToggles {
            robot: self.robot,
            lasers: self.lasers,
            particles: self.particles,
        }
    }
}

/// Geometry of the headless drawing surface.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub pixels_per_meter: f64,
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            pixels_per_meter: 100.0,
            width_px: 800,
            height_px: 800,
        }
    }
}

impl Settings {
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.timing.heartbeat_period_ms)
    }

    pub fn map_poll_period(&self) -> Duration {
        Duration::from_millis(self.timing.map_poll_period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge.request_timeout_ms)
    }

    /// Command-line flags win over the file.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(ref address) = cli.address {
            self.bridge.address = address.clone();
        }
        if let Some(ms) = cli.heartbeat_ms {
            self.timing.heartbeat_period_ms = ms;
        }
        if let Some(ms) = cli.map_poll_ms {
            self.timing.map_poll_period_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.heartbeat_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod("timing.heartbeat_period_ms"));
        }
        if self.timing.map_poll_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod("timing.map_poll_period_ms"));
        }
        if self.bridge.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroPeriod("bridge.request_timeout_ms"));
        }
        let scale = self.scene.pixels_per_meter;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConfigError::InvalidScale(scale));
        }
        for (i, a) in ChannelId::ALL.iter().enumerate() {
            let name = self.channels.name(*a);
            if ChannelId::ALL[i + 1..]
                .iter()
                .any(|&b| self.channels.name(b) == name)
            {
                return Err(ConfigError::DuplicateChannelName(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Parse settings from TOML text.
pub fn parse(text: &str) -> Result<Settings, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Load settings from `path`, or defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = parse("").expect("empty config");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.heartbeat_period(), Duration::from_millis(500));
        assert_eq!(settings.map_poll_period(), Duration::from_millis(2_000));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = parse(
            r#"
            [timing]
            map_poll_period_ms = 750

            [channels]
            pose = "MBOT_POSE"
            "#,
        )
        .expect("config");
        assert_eq!(settings.timing.map_poll_period_ms, 750);
        assert_eq!(settings.timing.heartbeat_period_ms, 500);
        assert_eq!(settings.channels.pose, "MBOT_POSE");
        assert_eq!(settings.channels.lidar, "LIDAR");
    }

    #[test]
    fn wire_names_resolve_both_ways() {
        let names = ChannelNames::default();
        for ch in ChannelId::ALL {
            assert_eq!(names.resolve(names.name(ch)), Some(ch));
        }
        assert_eq!(names.resolve("MBOT_MOTOR_COMMAND"), None);
    }

    #[test]
    fn zero_period_rejected() {
        let settings = parse("[timing]\nheartbeat_period_ms = 0\n").expect("config");
        let err = settings.validate().expect_err("zero period");
        assert!(err.to_string().contains("heartbeat_period_ms"));
    }

    #[test]
    fn non_positive_scale_rejected() {
        for text in ["[scene]\npixels_per_meter = 0.0\n", "[scene]\npixels_per_meter = -20.0\n"] {
            let settings = parse(text).expect("config");
            assert!(matches!(settings.validate(), Err(ConfigError::InvalidScale(_))));
        }
        let mut settings = Settings::default();
        settings.scene.pixels_per_meter = f64::NAN;
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidScale(_))));
    }

    #[test]
    fn duplicate_wire_name_rejected() {
        let settings = parse("[channels]\nlidar = \"SLAM_POSE\"\n").expect("config");
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::DuplicateChannelName(name)) if name == "SLAM_POSE"
        ));
    }

    #[test]
    fn unknown_field_type_is_parse_error() {
        assert!(matches!(
            parse("[timing]\nheartbeat_period_ms = \"fast\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn cli_overrides_file() {
        let mut settings = parse("[bridge]\naddress = \"10.0.0.2:5005\"\n").expect("config");
        let cli = Cli::parse_from(["mbot-console", "--heartbeat-ms", "250"]);
        settings.apply_overrides(&cli);
        assert_eq!(settings.bridge.address, "10.0.0.2:5005");
        assert_eq!(settings.timing.heartbeat_period_ms, 250);

        let cli = Cli::parse_from(["mbot-console", "--address", "mbot.local:5005"]);
        settings.apply_overrides(&cli);
        assert_eq!(settings.bridge.address, "mbot.local:5005");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load(Some(Path::new("/nonexistent/mbot-console.toml"))).expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("console.toml");
        std::fs::write(&path, "[display]\nlasers = true\n").expect("write");
        let settings = load(Some(&path)).expect("load");
        assert!(settings.display.toggles().lasers);
        assert!(settings.display.toggles().robot);
    }
}
