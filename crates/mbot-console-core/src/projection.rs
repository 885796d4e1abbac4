//! Telemetry projector: inbound messages and operator clicks to view state.
//!
//! The projections themselves (pixel/world/cell) belong to the rendering
//! surface and are reached through [`MapProjection`]; this module only
//! decides when to use them.

use crate::messages::ParticleSet;
use crate::types::{ClickedCell, GridCell, RobotPose};

/// Coordinate conversions offered by the rendering surface.
pub trait MapProjection {
    fn is_map_loaded(&self) -> bool;

    /// Cell under a pixel, or `None` when the pixel is off the map.
    fn pixels_to_cell(&self, px: f64, py: f64) -> Option<GridCell>;

    /// World position (meters) under a pixel.
    fn pixels_to_pos(&self, px: f64, py: f64) -> (f64, f64);

    fn pos_to_cell(&self, x: f64, y: f64) -> GridCell;
}

impl<T: MapProjection + ?Sized> MapProjection for &T {
    fn is_map_loaded(&self) -> bool {
        (**self).is_map_loaded()
    }

    fn pixels_to_cell(&self, px: f64, py: f64) -> Option<GridCell> {
        (**self).pixels_to_cell(px, py)
    }

    fn pixels_to_pos(&self, px: f64, py: f64) -> (f64, f64) {
        (**self).pixels_to_pos(px, py)
    }

    fn pos_to_cell(&self, x: f64, y: f64) -> GridCell {
        (**self).pos_to_cell(x, y)
    }
}

/// Pose plus the cell it falls in, when a map is loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPose {
    pub pose: RobotPose,
    pub cell: Option<GridCell>,
}

pub fn project_pose(pose: RobotPose, surface: &impl MapProjection) -> ProjectedPose {
    let cell = surface
        .is_map_loaded()
        .then(|| surface.pos_to_cell(pose.x, pose.y));
    ProjectedPose { pose, cell }
}

/// Particle positions, in message order.
pub fn particle_points(set: &ParticleSet) -> Vec<(f64, f64)> {
    set.particles.iter().map(|p| (p.pose.x, p.pose.y)).collect()
}

/// Resolve a click. `None` input is an explicit deselection.
///
/// Returns the new selection; `None` clears it.
pub fn project_click(click: Option<(f64, f64)>, surface: &impl MapProjection) -> Option<ClickedCell> {
    let (px, py) = click?;
    if !surface.is_map_loaded() {
        return None;
    }
    let cell = surface.pixels_to_cell(px, py)?;
    Some(ClickedCell {
        cell,
        world_pos: surface.pixels_to_pos(px, py),
    })
}
