//! Camera hardware abstraction.
//!
//! This module provides a trait-based abstraction over the platform camera
//! service and over one opened camera, allowing for both real hardware and
//! mock implementations for testing.

use super::{CameraDescriptor, Size};
use crate::buffers::{FrameBuffer, PixelFormat};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Errors that can occur during camera hardware operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no camera device available: {0}")]
    NoDevice(String),
    #[error("failed to query camera {id}: {reason}")]
    InfoFailed { id: u32, reason: String },
    #[error("failed to open camera {id}: {reason}")]
    OpenFailed { id: u32, reason: String },
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("preview display I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start preview: {0}")]
    StreamFailed(String),
    #[error("failed to take picture: {0}")]
    CaptureFailed(String),
}

/// Configuration values of an opened camera, plus what it advertises.
///
/// Read with [`CameraDevice::parameters`], edited, and written back with
/// [`CameraDevice::set_parameters`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    pub preview_size: Option<Size>,
    pub picture_size: Option<Size>,
    pub preview_format: Option<PixelFormat>,
    /// Advertised preview sizes, in device order.
    pub supported_preview_sizes: Vec<Size>,
    /// Advertised still-capture sizes, in device order.
    pub supported_picture_sizes: Vec<Size>,
    pub supported_preview_formats: Vec<PixelFormat>,
}

impl Parameters {
    /// Returns true if the device can stream previews in `format`.
    pub fn supports_preview_format(&self, format: PixelFormat) -> bool {
        self.supported_preview_formats.contains(&format)
    }
}

/// A caller-owned target that preview frames are rendered into.
pub trait DisplayTarget: Send + Sync + fmt::Debug {
    /// Stable identifier of the target.
    fn id(&self) -> u64;

    /// Current pixel dimensions, if known.
    fn size(&self) -> Option<Size>;
}

/// A plain display target for hosts that only need an identity and a size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    id: u64,
    width: u32,
    height: u32,
}

impl Surface {
    pub fn new(id: u64, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }
}

impl DisplayTarget for Surface {
    fn id(&self) -> u64 {
        self.id
    }

    fn size(&self) -> Option<Size> {
        Size::new(self.width, self.height)
    }
}

/// Non-owning reference to a display target.
///
/// The session never extends the target's lifetime; once the owner drops
/// it, [`SurfaceRef::upgrade`] returns `None`.
#[derive(Clone)]
pub struct SurfaceRef {
    id: u64,
    target: Weak<dyn DisplayTarget>,
}

impl SurfaceRef {
    pub fn new<T: DisplayTarget + 'static>(target: &Arc<T>) -> Self {
        let target: Arc<dyn DisplayTarget> = Arc::clone(target) as Arc<dyn DisplayTarget>;
        Self {
            id: target.id(),
            target: Arc::downgrade(&target),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the target if its owner still holds it.
    pub fn upgrade(&self) -> Option<Arc<dyn DisplayTarget>> {
        self.target.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl fmt::Debug for SurfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceRef")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// The driver-side queue that frame callbacks return buffers into.
pub trait BufferQueue {
    fn add_callback_buffer(&mut self, buffer: FrameBuffer);
}

impl BufferQueue for VecDeque<FrameBuffer> {
    fn add_callback_buffer(&mut self, buffer: FrameBuffer) {
        self.push_back(buffer);
    }
}

/// Receives filled preview buffers from the driver.
///
/// Invoked on the driver's delivery context, never on the command worker.
pub trait PreviewCallback: Send {
    /// Called once per frame with a buffer that was previously queued.
    fn on_preview_frame(&mut self, frame: FrameBuffer, queue: &mut dyn BufferQueue);
}

/// Receives the stages of a still capture, in this order: shutter, raw,
/// postview, final image.
pub trait PictureCallback {
    fn on_shutter(&mut self);
    fn on_raw(&mut self, data: Vec<u8>);
    fn on_postview(&mut self, data: Vec<u8>);
    fn on_image(&mut self, data: Vec<u8>);
}

/// The platform camera service.
pub trait CameraHal: Send {
    /// Number of camera indices the platform exposes.
    fn number_of_cameras(&self) -> u32;

    /// Reads the facing and mounting orientation of camera `index`.
    fn camera_info(&self, index: u32) -> Result<CameraDescriptor, DeviceError>;

    /// Acquires exclusive access to camera `id`.
    fn open(&mut self, id: u32) -> Result<Box<dyn CameraDevice>, DeviceError>;
}

/// One opened camera.
///
/// Implementations may block; callers serialize every call.
pub trait CameraDevice: Send {
    /// Returns the current parameters.
    fn parameters(&self) -> Parameters;

    /// Applies parameters. Sizes and formats must be among the advertised ones.
    fn set_parameters(&mut self, params: &Parameters) -> Result<(), DeviceError>;

    /// Sets the clockwise rotation applied to the preview image.
    fn set_display_orientation(&mut self, degrees: u16) -> Result<(), DeviceError>;

    /// Attaches the preview to a display target.
    fn set_preview_display(&mut self, target: &dyn DisplayTarget) -> Result<(), DeviceError>;

    /// Detaches the preview display.
    fn clear_preview_display(&mut self);

    /// Queues a buffer for the driver to fill.
    fn add_callback_buffer(&mut self, buffer: FrameBuffer);

    /// Installs or removes the frame callback.
    fn set_preview_callback(&mut self, callback: Option<Box<dyn PreviewCallback>>);

    fn start_preview(&mut self) -> Result<(), DeviceError>;

    fn stop_preview(&mut self);

    /// Runs a still capture, invoking `callback` stages in order before returning.
    fn take_picture(&mut self, callback: &mut dyn PictureCallback) -> Result<(), DeviceError>;

    /// Releases the hardware. The device must not be used afterwards.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_ref_does_not_own_target() {
        let surface = Arc::new(Surface::new(9, 1080, 1920));
        let reference = SurfaceRef::new(&surface);

        assert_eq!(reference.id(), 9);
        assert!(reference.upgrade().is_some());

        drop(surface);
        assert!(!reference.is_alive());
        assert!(reference.upgrade().is_none());
    }

    #[test]
    fn test_parameters_format_support() {
        let params = Parameters {
            supported_preview_formats: vec![PixelFormat::Nv21],
            ..Default::default()
        };
        assert!(params.supports_preview_format(PixelFormat::Nv21));
        assert!(!params.supports_preview_format(PixelFormat::Rgb565));
    }
}
