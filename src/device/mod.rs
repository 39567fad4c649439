//! Camera hardware access.
//!
//! This module provides the hardware abstraction the session drives, the
//! startup registry of available cameras, and a simulated platform used by
//! tests and the demonstration binary.

mod descriptor;
mod hal;
mod mock;
mod registry;

pub use descriptor::{CameraDescriptor, Facing, Size};
pub use hal::{
    BufferQueue, CameraDevice, CameraHal, DeviceError, DisplayTarget, Parameters,
    PictureCallback, PreviewCallback, Surface, SurfaceRef,
};
pub use mock::{DriverCall, MockCameraSpec, MockDriver, MockHal};
pub use registry::DeviceRegistry;
