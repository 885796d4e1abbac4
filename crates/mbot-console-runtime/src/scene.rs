//! Rendering collaborator: the drawing surface the console feeds.
//!
//! [`HeadlessScene`] draws nothing. It keeps the latest state handed to it
//! and implements the map projections, which is all a terminal console
//! needs.

use mbot_console_core::{GridCell, MapHeader, MapProjection, RobotPose};

/// Geometry of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width_px: u32,
    pub height_px: u32,
    pub pixels_per_meter: f64,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            width_px: 800,
            height_px: 800,
            pixels_per_meter: 100.0,
        }
    }
}

pub trait Scene: MapProjection {
    fn create_scene(&mut self, surface: Surface);
    fn toggle_robot_view(&mut self, visible: bool);
    fn update_robot(&mut self, x: f64, y: f64, theta: f64);
    fn draw_lasers(&mut self, ranges: &[f64], thetas: &[f64]);
    fn clear_lasers(&mut self);
    fn draw_particles(&mut self, points: &[(f64, f64)]);
    fn clear_particles(&mut self);
    fn draw_path(&mut self, path: &[RobotPose]);
    fn set_map_header_data(&mut self, header: &MapHeader);
    fn update_cells(&mut self, cells: &[i8]);
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaserSweep {
    pub ranges: Vec<f64>,
    pub thetas: Vec<f64>,
}

/// Scene with no output.
///
/// Pixel `(0, 0)` sits on the bottom-left corner of the map, `x` grows to
/// the right and `y` grows up, `pixels_per_meter` pixels to the meter.
#[derive(Debug, Clone, Default)]
pub struct HeadlessScene {
    surface: Surface,
    robot_visible: bool,
    robot: Option<RobotPose>,
    lasers: Option<LaserSweep>,
    particles: Vec<(f64, f64)>,
    path: Vec<RobotPose>,
    header: Option<MapHeader>,
    cells: Vec<i8>,
}

impl HeadlessScene {
    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn robot_visible(&self) -> bool {
        self.robot_visible
    }

    pub fn robot(&self) -> Option<RobotPose> {
        self.robot
    }

    pub fn lasers(&self) -> Option<&LaserSweep> {
        self.lasers.as_ref()
    }

    pub fn particles(&self) -> &[(f64, f64)] {
        &self.particles
    }

    pub fn path(&self) -> &[RobotPose] {
        &self.path
    }

    pub fn header(&self) -> Option<MapHeader> {
        self.header
    }

    pub fn cells(&self) -> &[i8] {
        &self.cells
    }

    fn origin(&self) -> (f64, f64) {
        self.header.map(|h| h.origin).unwrap_or((0.0, 0.0))
    }
}

impl Scene for HeadlessScene {
    fn create_scene(&mut self, surface: Surface) {
        *self = Self {
            surface,
            ..Self::default()
        };
    }

    fn toggle_robot_view(&mut self, visible: bool) {
        self.robot_visible = visible;
    }

    fn update_robot(&mut self, x: f64, y: f64, theta: f64) {
        self.robot = Some(RobotPose { x, y, theta });
    }

    fn draw_lasers(&mut self, ranges: &[f64], thetas: &[f64]) {
        self.lasers = Some(LaserSweep {
            ranges: ranges.to_vec(),
            thetas: thetas.to_vec(),
        });
    }

    fn clear_lasers(&mut self) {
        self.lasers = None;
    }

    fn draw_particles(&mut self, points: &[(f64, f64)]) {
        self.particles = points.to_vec();
    }

    fn clear_particles(&mut self) {
        self.particles.clear();
    }

    fn draw_path(&mut self, path: &[RobotPose]) {
        self.path = path.to_vec();
    }

    fn set_map_header_data(&mut self, header: &MapHeader) {
        self.header = Some(*header);
        self.cells.clear();
    }

    fn update_cells(&mut self, cells: &[i8]) {
        self.cells = cells.to_vec();
    }
}

impl MapProjection for HeadlessScene {
    fn is_map_loaded(&self) -> bool {
        self.header.is_some_and(|h| {
            !self.cells.is_empty() && self.cells.len() == h.width as usize * h.height as usize
        })
    }

    fn pixels_to_cell(&self, px: f64, py: f64) -> Option<GridCell> {
        let header = self.header?;
        let (x, y) = self.pixels_to_pos(px, py);
        let cell = self.pos_to_cell(x, y);
        let inside = (0..header.height as i64).contains(&i64::from(cell.row))
            && (0..header.width as i64).contains(&i64::from(cell.col));
        inside.then_some(cell)
    }

    fn pixels_to_pos(&self, px: f64, py: f64) -> (f64, f64) {
        let (ox, oy) = self.origin();
        let scale = self.surface.pixels_per_meter;
        (ox + px / scale, oy + py / scale)
    }

    fn pos_to_cell(&self, x: f64, y: f64) -> GridCell {
        let Some(header) = self.header else {
            return GridCell::default();
        };
        let (ox, oy) = header.origin;
        GridCell {
            row: ((y - oy) / header.meters_per_cell).floor() as i32,
            col: ((x - ox) / header.meters_per_cell).floor() as i32,
        }
    }
}
