//! Preview orientation compensation.
//!
//! The sensor is mounted at a fixed angle and the screen may be rotated;
//! the preview must be turned so the image appears upright. Front cameras
//! are additionally mirrored, which reverses the direction of rotation.

use crate::device::Facing;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

/// Screen rotation relative to the device's natural orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Normalizes any angle to the nearest quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        match ((degrees.rem_euclid(360) + 45) / 90) % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

impl From<i32> for Rotation {
    fn from(degrees: i32) -> Self {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Rotation, in degrees clockwise, to apply to the preview image.
pub fn compute_compensation(facing: Facing, sensor_orientation: u16, display: Rotation) -> u16 {
    let sensor = u32::from(sensor_orientation % 360);
    let degrees = u32::from(display.degrees());
    let result = match facing {
        Facing::Front => {
            let rotated = (sensor + degrees) % 360;
            // mirror
            (360 - rotated) % 360
        }
        Facing::Back => (sensor + 360 - degrees) % 360,
    };
    result as u16
}

/// Display rotation shared between the view layer and the session worker.
///
/// The view layer writes whenever the screen turns; the worker reads it
/// when a camera is opened.
#[derive(Debug, Clone, Default)]
pub struct DisplayRotation {
    degrees: Arc<AtomicU16>,
}

impl DisplayRotation {
    pub fn new(rotation: Rotation) -> Self {
        Self {
            degrees: Arc::new(AtomicU16::new(rotation.degrees())),
        }
    }

    pub fn get(&self) -> Rotation {
        Rotation::from_degrees(i32::from(self.degrees.load(Ordering::Acquire)))
    }

    pub fn set(&self, rotation: Rotation) {
        self.degrees.store(rotation.degrees(), Ordering::Release);
    }
}
