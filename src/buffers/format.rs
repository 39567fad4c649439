//! Preview pixel formats and their storage cost.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel layouts a device may stream preview frames in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// YCrCb 4:2:0 semi-planar, the common preview default.
    Nv21,
    /// YCrCb 4:2:0 planar.
    Yv12,
    /// YCbCr 4:2:2 interleaved.
    Yuy2,
    /// Packed 16-bit RGB.
    Rgb565,
}

impl PixelFormat {
    /// Average bits used to store one pixel.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Nv21 | PixelFormat::Yv12 => 12,
            PixelFormat::Yuy2 | PixelFormat::Rgb565 => 16,
        }
    }

    /// Bytes needed to hold one frame of `width` x `height` pixels.
    pub fn frame_len(self, width: u32, height: u32) -> usize {
        let bits = u64::from(width) * u64::from(height) * u64::from(self.bits_per_pixel());
        (bits / 8) as usize
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Nv21 => "NV21",
            PixelFormat::Yv12 => "YV12",
            PixelFormat::Yuy2 => "YUY2",
            PixelFormat::Rgb565 => "RGB565",
        };
        f.write_str(name)
    }
}
