//! mbot-console-core: state and transforms of the teleoperation console.
//!
//! Everything in this crate is synchronous and side-effect free. Commands
//! destined for the robot are returned as values; the runtime crate owns
//! the transport, timers, and the rendering surface.

pub mod confirm;
pub mod connectivity;
pub mod messages;
pub mod projection;
pub mod slam;
pub mod status;
pub mod types;

pub use confirm::{Confirm, ConfirmPolicy};
pub use connectivity::{ConnectivityChange, ConnectivityState};
pub use messages::{LidarScan, Telemetry};
pub use projection::MapProjection;
pub use slam::{SlamCommand, SlamModeStateMachine, TransitionOutcome};
pub use types::{
    ChannelId, ClickedCell, CoreError, GridCell, MapHeader, MapSnapshot, RobotPose, SlamMode,
};
