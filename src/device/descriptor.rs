//! Static camera descriptions and resolution values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a camera points relative to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Points toward the operator.
    Front,
    /// Points away from the operator.
    Back,
}

impl Facing {
    /// Returns the opposite facing.
    pub fn opposite(self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Front => f.write_str("front"),
            Facing::Back => f.write_str("back"),
        }
    }
}

/// Immutable description of one hardware camera.
///
/// Created once during enumeration and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraDescriptor {
    id: u32,
    facing: Facing,
    sensor_orientation: u16,
}

impl CameraDescriptor {
    /// Creates a descriptor. The mounting orientation is reduced modulo 360.
    pub fn new(id: u32, facing: Facing, sensor_orientation: u16) -> Self {
        Self {
            id,
            facing,
            sensor_orientation: sensor_orientation % 360,
        }
    }

    /// Platform camera index.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Camera facing.
    #[inline]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Fixed sensor mounting orientation in degrees (0-359).
    #[inline]
    pub fn sensor_orientation(&self) -> u16 {
        self.sensor_orientation
    }
}

/// A width/height pair in pixels. Both sides are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct Size {
    width: u32,
    height: u32,
}

impl Size {
    /// Creates a size, returning `None` when either side is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height, in single precision.
    ///
    /// Ratio matching compares these values for exact equality, so the
    /// precision must stay the same on both sides of the comparison.
    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl TryFrom<(u32, u32)> for Size {
    type Error = String;

    fn try_from((width, height): (u32, u32)) -> Result<Self, Self::Error> {
        Size::new(width, height).ok_or_else(|| format!("invalid size {}x{}", width, height))
    }
}

impl From<Size> for (u32, u32) {
    fn from(size: Size) -> Self {
        (size.width, size.height)
    }
}
