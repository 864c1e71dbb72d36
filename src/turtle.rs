//! Turtle state and operations for voxel construction.

use crate::error::{EngineError, EngineResult};
use crate::orientation::{
    grid_align, heading, heading_angles, make_matrix, pitch_matrix, roll_matrix, yaw_matrix,
};
use crate::raster::rasterize;
use crate::space::{MaterialSpec, SharedSpace};
use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// The drawable state of the turtle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurtleState {
    /// Current world-space position of the cursor.
    pub position: DVec3,

    /// Current orientation. The third column is the heading.
    pub orientation: DMat3,

    /// When set, forward/backward moves record placements along the path.
    pub pen_down: bool,

    /// Material used for placements recorded while the pen is down.
    pub material: MaterialSpec,

    /// Display compass angle in degrees, derived from the orientation.
    pub yaw: f64,

    /// Display vertical angle in degrees, derived from the orientation.
    pub pitch: f64,
}

impl Default for TurtleState {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            orientation: DMat3::IDENTITY,
            pen_down: false,
            material: MaterialSpec::default(),
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl TurtleState {
    /// Returns the turtle's local forward direction in world space.
    pub fn heading(&self) -> DVec3 {
        heading(&self.orientation)
    }

    /// Recomputes the display angles from the heading.
    ///
    /// When the heading is nearly vertical the compass angle is kept as it was.
    pub fn direction_out(&mut self) {
        let h = self.heading();
        let horizontal = (h.x * h.x + h.y * h.y).sqrt();
        self.pitch = (-h.y).atan2(horizontal).to_degrees();
        if horizontal >= 1e-9 {
            self.yaw = (-h.x).atan2(h.z).to_degrees();
        }
    }
}

/// A saved copy of everything `pop` restores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub position: DVec3,
    pub orientation: DMat3,
    pub pen_down: bool,
    pub material: MaterialSpec,
}

/// A 3D turtle drawing into a [`Space`](crate::Space).
pub struct Turtle {
    state: TurtleState,
    stack: Vec<Snapshot>,
    space: SharedSpace,
}

impl Turtle {
    /// Creates a turtle standing on the space's origin, facing +Z, pen up.
    pub fn new(space: SharedSpace, material: MaterialSpec) -> Self {
        let position = space.lock().origin();
        Self {
            state: TurtleState {
                position,
                material,
                ..Default::default()
            },
            stack: Vec::new(),
            space,
        }
    }

    pub fn state(&self) -> &TurtleState {
        &self.state
    }

    pub fn position(&self) -> DVec3 {
        self.state.position
    }

    pub fn orientation(&self) -> DMat3 {
        self.state.orientation
    }

    pub fn heading(&self) -> DVec3 {
        self.state.heading()
    }

    pub fn space(&self) -> &SharedSpace {
        &self.space
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Moves along the heading, recording the traversed voxels when the pen is down.
    pub fn forward(&mut self, distance: f64) {
        let start = self.state.position;
        let end = start + self.heading() * distance;
        if self.state.pen_down {
            let mut space = self.space.lock();
            for point in rasterize(start, end) {
                space.plot(point, self.state.material.clone());
            }
        }
        self.state.position = end;
    }

    pub fn backward(&mut self, distance: f64) {
        self.forward(-distance);
    }

    /// Rotates about the local vertical axis (local frame).
    pub fn yaw(&mut self, angle: f64) {
        self.state.orientation *= yaw_matrix(angle);
        self.state.direction_out();
    }

    /// Rotates about the local lateral axis (local frame).
    pub fn pitch(&mut self, angle: f64) {
        self.state.orientation *= pitch_matrix(angle);
        self.state.direction_out();
    }

    /// Rotates about the heading (local frame).
    pub fn roll(&mut self, angle: f64) {
        self.state.orientation *= roll_matrix(angle);
        self.state.direction_out();
    }

    /// Turns about the world vertical axis, whatever the current pitch or roll.
    pub fn turn_right(&mut self, angle: f64) {
        self.state.orientation = yaw_matrix(angle) * self.state.orientation;
        self.state.direction_out();
    }

    pub fn turn_left(&mut self, angle: f64) {
        self.turn_right(-angle);
    }

    pub fn up(&mut self, angle: f64) {
        self.pitch(angle);
    }

    pub fn down(&mut self, angle: f64) {
        self.pitch(-angle);
    }

    /// Replaces the orientation with `yaw(compass) * pitch(vertical) * roll(roll)`.
    pub fn set_angle(&mut self, compass: f64, vertical: f64, roll: f64) {
        self.state.orientation = make_matrix(compass, vertical, roll);
        self.state.direction_out();
    }

    /// Keeps the compass bearing and sets an absolute vertical angle, dropping roll.
    pub fn set_vertical(&mut self, vertical: f64) {
        let (compass, _) = heading_angles(&self.state.orientation);
        self.state.orientation = yaw_matrix(compass) * pitch_matrix(vertical);
        self.state.direction_out();
    }

    /// Keeps compass and vertical angle and sets an absolute roll.
    pub fn set_roll(&mut self, roll: f64) {
        let (compass, vertical) = heading_angles(&self.state.orientation);
        self.state.orientation = make_matrix(compass, vertical, roll);
        self.state.direction_out();
    }

    /// Snaps the orientation to the nearest axis-aligned frame.
    pub fn grid_align(&mut self) {
        self.state.orientation = grid_align(&self.state.orientation);
        self.state.direction_out();
    }

    /// Jumps back to the space's current origin without drawing. Orientation is kept.
    pub fn home(&mut self) {
        let origin = self.space.lock().origin();
        self.goto(origin);
    }

    /// Jumps to `position` without drawing.
    pub fn goto(&mut self, position: DVec3) {
        self.state.position = position;
        self.state.direction_out();
    }

    pub fn pen_up(&mut self) {
        self.state.pen_down = false;
    }

    pub fn pen_down(&mut self) {
        self.state.pen_down = true;
    }

    pub fn set_material(&mut self, material: MaterialSpec) {
        self.state.material = material;
    }

    /// Saves position, orientation, pen and material.
    pub fn push(&mut self) {
        self.stack.push(self.snapshot());
    }

    /// Restores the most recently pushed state.
    pub fn pop(&mut self) -> EngineResult<()> {
        let snapshot = self.stack.pop().ok_or(EngineError::EmptyStack)?;
        self.restore(snapshot);
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            position: self.state.position,
            orientation: self.state.orientation,
            pen_down: self.state.pen_down,
            material: self.state.material.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.state.position = snapshot.position;
        self.state.orientation = snapshot.orientation;
        self.state.pen_down = snapshot.pen_down;
        self.state.material = snapshot.material;
        self.state.direction_out();
    }
}

/// Operations that an instruction symbol can trigger on a [`Turtle`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TurtleOp {
    // --- Movement ---
    /// Move forward recording placements (`F`), pen forced down for the step.
    Draw,
    /// Move forward without recording (`f`).
    Move,

    // --- Rotation ---
    /// Local yaw (`+`/`-`).
    Yaw(f64),
    /// Local pitch (`&`/`^`).
    Pitch(f64),
    /// Local roll (`\` / `/`).
    Roll(f64),
    /// Turn 180 degrees (`|`).
    TurnAround,
    /// Snap to the grid (`G`).
    GridAlign,

    // --- Pen ---
    PenUp,
    PenDown,

    // --- Flow Control ---
    /// Save the turtle state onto the stack (`[`).
    Push,
    /// Restore the most recently pushed turtle state (`]`).
    Pop,
    /// No-op: symbol has no registered meaning.
    Ignore,
}
