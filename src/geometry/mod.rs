//! Pure geometry used to configure a camera for a display target.
//!
//! Nothing here touches hardware: orientation compensation maps screen and
//! sensor angles to a preview rotation, and size selection picks resolutions
//! from a device's advertised lists.

mod orientation;
mod sizing;

pub use orientation::{compute_compensation, DisplayRotation, Rotation};
pub use sizing::{select_capture_size, select_preview_size};
