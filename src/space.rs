//! The coordinate frame and the log of planned placements.

use glam::DVec3;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A material identifier plus its auxiliary variant byte.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialSpec {
    /// Block name understood by the world, e.g. `"stone"`.
    pub name: String,
    /// Variant/data value applied alongside the name.
    pub data: u8,
}

impl MaterialSpec {
    pub fn new(name: impl Into<String>, data: u8) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl Default for MaterialSpec {
    fn default() -> Self {
        Self::new("stone", 0)
    }
}

/// One planned voxel write at an absolute world position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: DVec3,
    pub material: MaterialSpec,
}

/// Coordinate frame and placement log.
///
/// The origin is the world coordinate treated as logical `(0, 0, 0)`; it starts at
/// zero and is replaced by calibration. Placements are append-only until drained.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Space {
    origin: DVec3,
    plot: Vec<Placement>,
}

/// A [`Space`] shared between the script evaluators and the receive path.
pub type SharedSpace = Arc<Mutex<Space>>;

impl Space {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a fresh space for sharing across threads.
    pub fn shared() -> SharedSpace {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: DVec3) {
        self.origin = origin;
    }

    /// Appends a placement at an absolute position.
    pub fn plot(&mut self, position: DVec3, material: MaterialSpec) {
        self.plot.push(Placement { position, material });
    }

    /// Appends a placement at `origin + offset`.
    pub fn plot_relative(&mut self, offset: DVec3, material: MaterialSpec) {
        self.plot(self.origin + offset, material);
    }

    pub fn placements(&self) -> &[Placement] {
        &self.plot
    }

    pub fn len(&self) -> usize {
        self.plot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plot.is_empty()
    }

    /// Takes every pending placement, oldest first, leaving the log empty.
    pub fn drain(&mut self) -> Vec<Placement> {
        std::mem::take(&mut self.plot)
    }
}
