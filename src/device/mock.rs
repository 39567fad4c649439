//! In-memory camera platform.
//!
//! Behaves like a single-client camera service: one device open at a time,
//! advertised size lists in a fixed order, a callback-buffer queue and an
//! ordered still-capture sequence. A [`MockDriver`] handle plays the role of
//! the driver's streaming context, delivering frames on whatever thread
//! calls [`MockDriver::pump_frames`].

use super::hal::{
    CameraDevice, CameraHal, DeviceError, DisplayTarget, Parameters, PictureCallback,
    PreviewCallback,
};
use super::{CameraDescriptor, Facing, Size};
use crate::buffers::{FrameBuffer, PixelFormat};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Description of one simulated camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockCameraSpec {
    pub facing: Facing,
    /// Sensor mounting orientation in degrees.
    pub sensor_orientation: u16,
    /// Advertised preview sizes, in the order the device reports them.
    #[serde(default = "default_preview_sizes")]
    pub preview_sizes: Vec<Size>,
    /// Advertised still-capture sizes, in the order the device reports them.
    #[serde(default = "default_picture_sizes")]
    pub picture_sizes: Vec<Size>,
    #[serde(default = "default_preview_formats")]
    pub preview_formats: Vec<PixelFormat>,
    /// Make every preview display attach fail with an I/O error.
    #[serde(default)]
    pub fail_surface_bind: bool,
}

fn sizes(list: &[(u32, u32)]) -> Vec<Size> {
    list.iter().filter_map(|&(w, h)| Size::new(w, h)).collect()
}

fn default_preview_sizes() -> Vec<Size> {
    sizes(&[
        (1920, 1080),
        (1440, 1080),
        (1280, 720),
        (960, 720),
        (640, 480),
        (352, 288),
    ])
}

fn default_picture_sizes() -> Vec<Size> {
    sizes(&[
        (4032, 3024),
        (4000, 2250),
        (1920, 1080),
        (1440, 1080),
        (640, 480),
    ])
}

fn default_preview_formats() -> Vec<PixelFormat> {
    vec![PixelFormat::Nv21, PixelFormat::Yv12]
}

impl MockCameraSpec {
    /// A camera with the default advertised lists.
    pub fn new(facing: Facing, sensor_orientation: u16) -> Self {
        Self {
            facing,
            sensor_orientation,
            preview_sizes: default_preview_sizes(),
            picture_sizes: default_picture_sizes(),
            preview_formats: default_preview_formats(),
            fail_surface_bind: false,
        }
    }

    pub fn with_preview_sizes(mut self, preview_sizes: Vec<Size>) -> Self {
        self.preview_sizes = preview_sizes;
        self
    }

    pub fn with_picture_sizes(mut self, picture_sizes: Vec<Size>) -> Self {
        self.picture_sizes = picture_sizes;
        self
    }

    pub fn with_preview_formats(mut self, preview_formats: Vec<PixelFormat>) -> Self {
        self.preview_formats = preview_formats;
        self
    }

    pub fn with_failing_surface(mut self) -> Self {
        self.fail_surface_bind = true;
        self
    }

    fn initial_parameters(&self) -> Parameters {
        let preview_format = if self.preview_formats.contains(&PixelFormat::Nv21) {
            Some(PixelFormat::Nv21)
        } else {
            self.preview_formats.first().copied()
        };
        Parameters {
            preview_size: self.preview_sizes.first().copied(),
            picture_size: self.picture_sizes.first().copied(),
            preview_format,
            supported_preview_sizes: self.preview_sizes.clone(),
            supported_picture_sizes: self.picture_sizes.clone(),
            supported_preview_formats: self.preview_formats.clone(),
        }
    }
}

/// A driver-level call, recorded in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Open(u32),
    SetDisplayOrientation(u16),
    SetParameters {
        preview_size: Option<Size>,
        picture_size: Option<Size>,
        preview_format: Option<PixelFormat>,
    },
    SetPreviewDisplay(u64),
    ClearPreviewDisplay,
    AddCallbackBuffer { slot: usize, generation: u64 },
    StartPreview,
    StopPreview,
    TakePicture,
    Release(u32),
}

struct OpenCamera {
    id: u32,
    spec: MockCameraSpec,
    params: Parameters,
    orientation: u16,
    display: Option<u64>,
    callback: Option<Box<dyn PreviewCallback>>,
    buffers: VecDeque<FrameBuffer>,
    previewing: bool,
}

#[derive(Default)]
struct DriverState {
    open: Option<OpenCamera>,
    calls: Vec<DriverCall>,
    opens: u32,
    releases: u32,
    frame_counter: u64,
    starved: u64,
}

impl DriverState {
    fn open_camera(&mut self, id: u32) -> Result<&mut OpenCamera, DeviceError> {
        match self.open.as_mut() {
            Some(open) if open.id == id => Ok(open),
            _ => Err(DeviceError::ConfigFailed(format!(
                "camera {} is not open",
                id
            ))),
        }
    }
}

/// Shared view of the simulated driver.
///
/// Cloning is cheap; all clones observe the same driver.
#[derive(Clone, Default)]
pub struct MockDriver {
    shared: Arc<Mutex<DriverState>>,
}

impl MockDriver {
    /// Delivers up to `count` preview frames to the installed callback.
    ///
    /// Stops early when preview is not running. A frame with no queued
    /// buffer is dropped and counted as starved. Returns the number of
    /// frames handed to the callback.
    pub fn pump_frames(&self, count: usize) -> usize {
        let mut delivered = 0;
        for _ in 0..count {
            let mut guard = self.shared.lock();
            let state = &mut *guard;
            let Some(open) = state.open.as_mut() else {
                break;
            };
            if !open.previewing {
                break;
            }
            let Some(mut buffer) = open.buffers.pop_front() else {
                state.starved += 1;
                continue;
            };

            state.frame_counter += 1;
            let sequence = state.frame_counter;
            buffer.set_sequence(sequence);
            buffer.bytes_mut().fill((sequence % 251) as u8);

            match open.callback.as_mut() {
                Some(callback) => callback.on_preview_frame(buffer, &mut open.buffers),
                None => open.buffers.push_back(buffer),
            }
            delivered += 1;
        }
        delivered
    }

    /// Every driver call so far.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.shared.lock().calls.clone()
    }

    fn with_open<T>(&self, read: impl FnOnce(&OpenCamera) -> T) -> Option<T> {
        self.shared.lock().open.as_ref().map(read)
    }

    /// Id of the camera currently open, if any.
    pub fn open_camera(&self) -> Option<u32> {
        self.with_open(|o| o.id)
    }

    pub fn is_previewing(&self) -> bool {
        self.with_open(|o| o.previewing).unwrap_or(false)
    }

    pub fn display_orientation(&self) -> Option<u16> {
        self.with_open(|o| o.orientation)
    }

    pub fn preview_display(&self) -> Option<u64> {
        self.with_open(|o| o.display).flatten()
    }

    pub fn parameters(&self) -> Option<Parameters> {
        self.with_open(|o| o.params.clone())
    }

    /// Buffers queued with the driver and waiting to be filled.
    pub fn queued_buffers(&self) -> usize {
        self.with_open(|o| o.buffers.len()).unwrap_or(0)
    }

    pub fn opens(&self) -> u32 {
        self.shared.lock().opens
    }

    pub fn releases(&self) -> u32 {
        self.shared.lock().releases
    }

    /// Frames dropped because no buffer was queued.
    pub fn starved_frames(&self) -> u64 {
        self.shared.lock().starved
    }
}

/// Simulated camera service.
pub struct MockHal {
    cameras: Vec<MockCameraSpec>,
    driver: MockDriver,
}

impl MockHal {
    pub fn new(cameras: Vec<MockCameraSpec>) -> Self {
        Self {
            cameras,
            driver: MockDriver::default(),
        }
    }

    /// A back camera mounted at 90 degrees and a front camera at 270.
    pub fn with_default_cameras() -> Self {
        Self::new(vec![
            MockCameraSpec::new(Facing::Back, 90),
            MockCameraSpec::new(Facing::Front, 270),
        ])
    }

    /// Handle onto the driver shared by every device this HAL opens.
    pub fn driver(&self) -> MockDriver {
        self.driver.clone()
    }
}

impl CameraHal for MockHal {
    fn number_of_cameras(&self) -> u32 {
        self.cameras.len() as u32
    }

    fn camera_info(&self, index: u32) -> Result<CameraDescriptor, DeviceError> {
        let spec = self
            .cameras
            .get(index as usize)
            .ok_or(DeviceError::InfoFailed {
                id: index,
                reason: "index out of range".into(),
            })?;
        Ok(CameraDescriptor::new(
            index,
            spec.facing,
            spec.sensor_orientation,
        ))
    }

    fn open(&mut self, id: u32) -> Result<Box<dyn CameraDevice>, DeviceError> {
        let spec = self
            .cameras
            .get(id as usize)
            .cloned()
            .ok_or_else(|| DeviceError::OpenFailed {
                id,
                reason: "no such camera".into(),
            })?;

        let mut state = self.driver.shared.lock();
        if let Some(open) = &state.open {
            return Err(DeviceError::OpenFailed {
                id,
                reason: format!("camera service busy with camera {}", open.id),
            });
        }

        state.open = Some(OpenCamera {
            id,
            params: spec.initial_parameters(),
            spec,
            orientation: 0,
            display: None,
            callback: None,
            buffers: VecDeque::new(),
            previewing: false,
        });
        state.opens += 1;
        state.calls.push(DriverCall::Open(id));
        tracing::info!(camera_id = id, "MockHal opened camera");

        Ok(Box::new(MockDevice {
            id,
            shared: Arc::clone(&self.driver.shared),
        }))
    }
}

/// Handle onto the camera opened through [`MockHal`].
struct MockDevice {
    id: u32,
    shared: Arc<Mutex<DriverState>>,
}

impl MockDevice {
    fn validate(open: &OpenCamera, params: &Parameters) -> Result<(), DeviceError> {
        let spec = &open.spec;
        if let Some(size) = params.preview_size {
            if !spec.preview_sizes.contains(&size) {
                return Err(unsupported("preview size", size));
            }
        }
        if let Some(size) = params.picture_size {
            if !spec.picture_sizes.contains(&size) {
                return Err(unsupported("picture size", size));
            }
        }
        if let Some(format) = params.preview_format {
            if !spec.preview_formats.contains(&format) {
                return Err(unsupported("preview format", format));
            }
        }
        Ok(())
    }
}

fn unsupported(what: &str, value: impl std::fmt::Display) -> DeviceError {
    DeviceError::ConfigFailed(format!("unsupported {} {}", what, value))
}

impl CameraDevice for MockDevice {
    fn parameters(&self) -> Parameters {
        let state = self.shared.lock();
        match state.open.as_ref() {
            Some(open) if open.id == self.id => open.params.clone(),
            _ => Parameters::default(),
        }
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), DeviceError> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        let open = state.open_camera(self.id)?;
        Self::validate(open, params)?;

        let stream_changed = open.params.preview_size != params.preview_size
            || open.params.preview_format != params.preview_format;
        if stream_changed && open.previewing {
            return Err(DeviceError::ConfigFailed(
                "preview size or format cannot change while previewing".into(),
            ));
        }
        if stream_changed && !open.buffers.is_empty() {
            // Queued buffers were sized for the previous stream.
            tracing::debug!(
                dropped = open.buffers.len(),
                "MockDevice dropped stale buffers"
            );
            open.buffers.clear();
        }

        open.params.preview_size = params.preview_size;
        open.params.picture_size = params.picture_size;
        open.params.preview_format = params.preview_format;
        state.calls.push(DriverCall::SetParameters {
            preview_size: params.preview_size,
            picture_size: params.picture_size,
            preview_format: params.preview_format,
        });
        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u16) -> Result<(), DeviceError> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        let open = state.open_camera(self.id)?;
        if degrees % 90 != 0 || degrees >= 360 {
            let reason = format!("invalid display orientation {}", degrees);
            return Err(DeviceError::ConfigFailed(reason));
        }
        open.orientation = degrees;
        state.calls.push(DriverCall::SetDisplayOrientation(degrees));
        Ok(())
    }

    fn set_preview_display(&mut self, target: &dyn DisplayTarget) -> Result<(), DeviceError> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        let open = state.open_camera(self.id)?;
        if open.spec.fail_surface_bind {
            return Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "surface is not ready",
            )));
        }
        open.display = Some(target.id());
        state.calls.push(DriverCall::SetPreviewDisplay(target.id()));
        Ok(())
    }

    fn clear_preview_display(&mut self) {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        if let Ok(open) = state.open_camera(self.id) {
            open.display = None;
            open.previewing = false;
            state.calls.push(DriverCall::ClearPreviewDisplay);
        }
    }

    fn add_callback_buffer(&mut self, buffer: FrameBuffer) {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        let call = DriverCall::AddCallbackBuffer {
            slot: buffer.slot(),
            generation: buffer.generation(),
        };
        if let Ok(open) = state.open_camera(self.id) {
            open.buffers.push_back(buffer);
            state.calls.push(call);
        }
    }

    fn set_preview_callback(&mut self, callback: Option<Box<dyn PreviewCallback>>) {
        let mut guard = self.shared.lock();
        if let Ok(open) = guard.open_camera(self.id) {
            open.callback = callback;
        }
    }

    fn start_preview(&mut self) -> Result<(), DeviceError> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        let open = state
            .open_camera(self.id)
            .map_err(|e| DeviceError::StreamFailed(e.to_string()))?;
        if open.display.is_none() {
            let reason = "no preview display attached".to_string();
            return Err(DeviceError::StreamFailed(reason));
        }
        open.previewing = true;
        state.calls.push(DriverCall::StartPreview);
        Ok(())
    }

    fn stop_preview(&mut self) {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        if let Ok(open) = state.open_camera(self.id) {
            open.previewing = false;
            state.calls.push(DriverCall::StopPreview);
        }
    }

    fn take_picture(&mut self, callback: &mut dyn PictureCallback) -> Result<(), DeviceError> {
        let picture_size = {
            let mut guard = self.shared.lock();
            let state = &mut *guard;
            let open = state
                .open_camera(self.id)
                .map_err(|e| DeviceError::CaptureFailed(e.to_string()))?;
            let size = open.params.picture_size;
            state.calls.push(DriverCall::TakePicture);
            size
        };

        let (width, height) = picture_size.map_or((0, 0), |s| (s.width(), s.height()));
        let mut image = vec![0xFF, 0xD8];
        image.extend_from_slice(&width.to_be_bytes());
        image.extend_from_slice(&height.to_be_bytes());
        image.extend_from_slice(&[0xFF, 0xD9]);

        callback.on_shutter();
        callback.on_raw(vec![0x52; 16]);
        callback.on_postview(vec![0x50; 8]);
        callback.on_image(image);
        Ok(())
    }

    fn release(&mut self) {
        let mut state = self.shared.lock();
        if state.open.as_ref().is_some_and(|o| o.id == self.id) {
            state.open = None;
            state.releases += 1;
            state.calls.push(DriverCall::Release(self.id));
            tracing::info!(camera_id = self.id, "MockHal released camera");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Surface;

    #[test]
    fn test_mock_hal_lifecycle() {
        let mut hal = MockHal::with_default_cameras();
        let driver = hal.driver();

        assert_eq!(hal.number_of_cameras(), 2);
        let mut device = hal.open(0).unwrap();
        assert_eq!(driver.open_camera(), Some(0));

        // Single client: a second open fails while the first is held.
        assert!(matches!(hal.open(1), Err(DeviceError::OpenFailed { .. })));

        device.release();
        assert_eq!(driver.open_camera(), None);
        assert_eq!(driver.releases(), 1);
    }

    #[test]
    fn test_start_preview_requires_display() {
        let mut hal = MockHal::with_default_cameras();
        let mut device = hal.open(0).unwrap();
        let result = device.start_preview();
        assert!(matches!(result, Err(DeviceError::StreamFailed(_))));

        let surface = Surface::new(1, 1080, 1920);
        device.set_preview_display(&surface).unwrap();
        device.start_preview().unwrap();
        assert!(hal.driver().is_previewing());
    }

    #[test]
    fn test_rejects_unadvertised_size() {
        let mut hal = MockHal::with_default_cameras();
        let mut device = hal.open(0).unwrap();
        let mut params = device.parameters();
        params.preview_size = Size::new(123, 45);
        let result = device.set_parameters(&params);
        assert!(matches!(result, Err(DeviceError::ConfigFailed(_))));
    }

    #[test]
    fn test_failing_surface() {
        let spec = MockCameraSpec::new(Facing::Back, 90).with_failing_surface();
        let mut hal = MockHal::new(vec![spec]);
        let mut device = hal.open(0).unwrap();
        let result = device.set_preview_display(&Surface::new(1, 640, 480));
        assert!(matches!(result, Err(DeviceError::Io(_))));
    }

    #[test]
    fn test_spec_from_toml_uses_defaults() {
        let text = "facing = \"front\"\nsensor_orientation = 270";
        let spec: MockCameraSpec = toml::from_str(text).unwrap();
        assert_eq!(spec, MockCameraSpec::new(Facing::Front, 270));
    }
}
