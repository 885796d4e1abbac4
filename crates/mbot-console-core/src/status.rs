//! Operator-facing status text.
//!
//! Pure formatting; the runtime decides when to print.

use std::fmt::Write as _;

use crate::connectivity::ConnectivityState;
use crate::types::{ClickedCell, GridCell, RobotPose, SlamMode};

/// Hostname shown until the robot reports one.
pub const UNKNOWN_HOSTNAME: &str = "mbot-???";

/// Connection indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No heartbeat result yet.
    Wait,
    Connected,
    NotConnected,
}

impl ConnectionStatus {
    pub fn from_state(state: &ConnectivityState) -> Self {
        if !state.heartbeat_seen() {
            Self::Wait
        } else if state.connected() {
            Self::Connected
        } else {
            Self::NotConnected
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Wait => "Wait",
            Self::Connected => "Connected",
            Self::NotConnected => "Not Connected",
        }
    }
}

/// Display toggles as the operator set them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayToggles {
    pub robot: bool,
    pub lasers: bool,
    pub particles: bool,
}

impl Default for DisplayToggles {
    fn default() -> Self {
        Self {
            robot: true,
            lasers: false,
            particles: false,
        }
    }
}

/// Snapshot of everything the status panel shows.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPanel {
    pub hostname: String,
    pub connection: ConnectionStatus,
    pub pose: Option<RobotPose>,
    pub robot_cell: GridCell,
    pub clicked: Option<ClickedCell>,
    pub slam_mode: SlamMode,
    /// SLAM controls are only offered once the robot publishes its mode.
    pub slam_controls: bool,
    pub toggles: DisplayToggles,
}

impl StatusPanel {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.hostname.to_uppercase());
        let _ = writeln!(out, "[{}]", self.connection.label());

        if let Some(pose) = self.pose {
            let _ = writeln!(
                out,
                "Robot Pose: (x: {:.3}, y: {:.3}, t: {:.3})",
                pose.x, pose.y, pose.theta
            );
            let _ = writeln!(
                out,
                "Robot Cell: ({}, {})",
                self.robot_cell.row, self.robot_cell.col
            );
        }
        if let Some(clicked) = self.clicked {
            let (x, y) = clicked.world_pos;
            let _ = writeln!(
                out,
                "Clicked: x: {x:.3}, y: {y:.3}, Cell: [{}, {}]",
                clicked.cell.col, clicked.cell.row
            );
        }

        if self.slam_controls {
            let _ = writeln!(
                out,
                "Localization Mode: {}",
                on_off(self.slam_mode != SlamMode::Idle)
            );
            if self.slam_mode != SlamMode::Idle {
                let _ = writeln!(
                    out,
                    "  Mapping Mode: {}",
                    on_off(self.slam_mode == SlamMode::FullSlam)
                );
            }
        }

        let _ = writeln!(out, "Draw Robot: {}", on_off(self.toggles.robot));
        let _ = writeln!(out, "Draw Particles: {}", on_off(self.toggles.particles));
        let _ = write!(out, "Draw Lasers: {}", on_off(self.toggles.lasers));
        out
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelId;

    fn panel() -> StatusPanel {
        StatusPanel {
            hostname: UNKNOWN_HOSTNAME.to_string(),
            connection: ConnectionStatus::Wait,
            pose: None,
            robot_cell: GridCell::default(),
            clicked: None,
            slam_mode: SlamMode::Invalid,
            slam_controls: false,
            toggles: DisplayToggles::default(),
        }
    }

    #[test]
    fn connection_status_follows_heartbeat() {
        let mut st = ConnectivityState::new(&ChannelId::ALL);
        assert_eq!(ConnectionStatus::from_state(&st), ConnectionStatus::Wait);
        st.apply_success(&[]);
        assert_eq!(ConnectionStatus::from_state(&st), ConnectionStatus::Connected);
        st.apply_failure();
        assert_eq!(
            ConnectionStatus::from_state(&st),
            ConnectionStatus::NotConnected
        );
    }

    #[test]
    fn render_minimal_panel() {
        let text = panel().render();
        assert!(text.starts_with("MBOT-???\n[Wait]"));
        assert!(!text.contains("Robot Pose"));
        assert!(!text.contains("Localization"));
        assert!(text.ends_with("Draw Lasers: off"));
    }

    #[test]
    fn render_pose_and_click() {
        let mut p = panel();
        p.pose = Some(RobotPose {
            x: 1.0,
            y: -0.5,
            theta: 1.23456,
        });
        p.robot_cell = GridCell { row: 4, col: 9 };
        p.clicked = Some(ClickedCell {
            cell: GridCell { row: 2, col: 7 },
            world_pos: (0.25, 0.125),
        });
        let text = p.render();
        assert!(text.contains("Robot Pose: (x: 1.000, y: -0.500, t: 1.235)"));
        assert!(text.contains("Robot Cell: (4, 9)"));
        assert!(text.contains("Clicked: x: 0.250, y: 0.125, Cell: [7, 2]"));
    }

    #[test]
    fn mapping_line_only_when_localizing() {
        let mut p = panel();
        p.slam_controls = true;
        p.slam_mode = SlamMode::Idle;
        let text = p.render();
        assert!(text.contains("Localization Mode: off"));
        assert!(!text.contains("Mapping Mode"));

        p.slam_mode = SlamMode::FullSlam;
        let text = p.render();
        assert!(text.contains("Localization Mode: on"));
        assert!(text.contains("Mapping Mode: on"));
    }
}
