//! The camera session state machine.
//!
//! [`CameraSession`] owns the hardware handle, the bound surface and the
//! preview buffer pool. It is moved into the worker thread and driven one
//! [`Command`] at a time; nothing else ever calls into the device.

use super::command::{Command, CommandKind};
use super::events::{EventBus, SessionEvent};
use super::hooks::{FrameObserver, Permission};
use super::preview::{CaptureRelay, RecyclingCallback};
use super::state::SessionState;
use super::SessionError;
use crate::buffers::{BufferPool, PoolStats};
use crate::config::SessionConfig;
use crate::device::{CameraDescriptor, CameraDevice, CameraHal, DeviceRegistry, Size, SurfaceRef};
use crate::geometry::{
    compute_compensation, select_capture_size, select_preview_size, DisplayRotation, Rotation,
};
use std::sync::Arc;

/// An opened camera and everything configured on it.
///
/// Holding one means the hardware is held. [`ActiveDevice::release`]
/// consumes it, so a released device cannot be touched again.
struct ActiveDevice {
    descriptor: CameraDescriptor,
    device: Box<dyn CameraDevice>,
    preview_size: Option<Size>,
    capture_size: Option<Size>,
    surface: Option<SurfaceRef>,
    pool: Option<BufferPool>,
    previewing: bool,
}

impl ActiveDevice {
    fn id(&self) -> u32 {
        self.descriptor.id()
    }

    fn state(&self) -> SessionState {
        if self.previewing {
            SessionState::Previewing
        } else {
            SessionState::Open
        }
    }

    fn stop_preview(&mut self) {
        self.device.stop_preview();
        self.device.set_preview_callback(None);
        self.previewing = false;
    }

    /// Stops streaming and returns the hardware to the platform.
    fn release(mut self) -> bool {
        let was_previewing = self.previewing;
        if was_previewing {
            self.stop_preview();
        } else {
            self.device.set_preview_callback(None);
        }
        self.device.release();
        if let Some(pool) = self.pool.take() {
            pool.retire();
        }
        tracing::debug!(
            camera_id = self.descriptor.id(),
            preview_size = ?self.preview_size,
            capture_size = ?self.capture_size,
            "Released camera"
        );
        was_previewing
    }
}

/// Single-owner camera session.
pub struct CameraSession {
    hal: Box<dyn CameraHal>,
    registry: Arc<DeviceRegistry>,
    config: SessionConfig,
    permission: Permission,
    rotation: DisplayRotation,
    events: EventBus,
    observer: Option<Arc<dyn FrameObserver>>,
    active: Option<ActiveDevice>,
    next_generation: u64,
}

/// Returns the open device, or `InvalidState` when the session is closed.
fn require(
    active: &mut Option<ActiveDevice>,
    command: CommandKind,
) -> Result<&mut ActiveDevice, SessionError> {
    active.as_mut().ok_or(SessionError::InvalidState {
        command,
        state: SessionState::Closed,
    })
}

impl CameraSession {
    pub fn new(
        hal: Box<dyn CameraHal>,
        registry: Arc<DeviceRegistry>,
        config: SessionConfig,
        permission: Permission,
        rotation: DisplayRotation,
        events: EventBus,
        observer: Option<Arc<dyn FrameObserver>>,
    ) -> Self {
        Self {
            hal,
            registry,
            config,
            permission,
            rotation,
            events,
            observer,
            active: None,
            next_generation: 1,
        }
    }

    pub fn state(&self) -> SessionState {
        self.active
            .as_ref()
            .map_or(SessionState::Closed, ActiveDevice::state)
    }

    /// Id of the held camera.
    pub fn camera_id(&self) -> Option<u32> {
        self.active.as_ref().map(ActiveDevice::id)
    }

    /// Accounting for the live buffer pool.
    pub fn pool_stats(&self) -> Option<Arc<PoolStats>> {
        self.active
            .as_ref()
            .and_then(|a| a.pool.as_ref())
            .map(BufferPool::stats)
    }

    /// Runs one command to completion.
    ///
    /// Every failure leaves the session in a consistent state and is
    /// returned for reporting; none of them poison the session.
    pub fn execute(&mut self, command: Command) -> Result<(), SessionError> {
        let kind = command.kind();
        tracing::debug!(command = %kind, state = %self.state(), "Executing command");

        match command {
            Command::Open { camera_id } => self.open(camera_id),
            Command::Close => {
                self.close();
                Ok(())
            }
            Command::SetPreviewSize {
                short_side,
                long_side,
            } => self.set_preview_size(short_side, long_side),
            Command::SetCaptureSize {
                short_side,
                long_side,
            } => self.set_capture_size(short_side, long_side),
            Command::BindSurface(surface) => self.bind_surface(surface),
            Command::UnbindSurface => {
                self.unbind_surface();
                Ok(())
            }
            Command::StartPreview => self.start_preview(),
            Command::StopPreview => self.stop_preview(),
            Command::Capture => self.capture(),
            Command::SetDisplayRotation(rotation) => self.set_display_rotation(rotation),
        }
    }

    /// Releases any held device. Called when the worker exits.
    pub fn shutdown(&mut self) {
        self.close();
    }

    fn open(&mut self, camera_id: u32) -> Result<(), SessionError> {
        if let Some(active) = &self.active {
            return Err(SessionError::ResourceConflict {
                held: active.id(),
                requested: camera_id,
            });
        }
        if !self.permission.is_granted() {
            return Err(SessionError::PermissionDenied);
        }
        let descriptor = self
            .registry
            .descriptor(camera_id)
            .ok_or_else(|| SessionError::NoDevice(format!("unknown camera id {}", camera_id)))?;

        let mut device = self.hal.open(camera_id)?;
        let orientation = compute_compensation(
            descriptor.facing(),
            descriptor.sensor_orientation(),
            self.rotation.get(),
        );
        if let Err(e) = device.set_display_orientation(orientation) {
            device.release();
            return Err(e.into());
        }

        tracing::info!(
            camera_id,
            facing = %descriptor.facing(),
            sensor_orientation = descriptor.sensor_orientation(),
            display_orientation = orientation,
            "Camera opened"
        );

        self.active = Some(ActiveDevice {
            descriptor,
            device,
            preview_size: None,
            capture_size: None,
            surface: None,
            pool: None,
            previewing: false,
        });
        self.events.emit(SessionEvent::DeviceOpened {
            camera_id,
            facing: descriptor.facing(),
            display_orientation: orientation,
        });
        Ok(())
    }

    fn close(&mut self) {
        let Some(active) = self.active.take() else {
            tracing::debug!("Close ignored, no camera held");
            return;
        };
        let camera_id = active.id();
        if active.release() {
            self.events.emit(SessionEvent::PreviewStopped);
        }
        tracing::info!(camera_id, "Camera closed");
        self.events.emit(SessionEvent::DeviceClosed { camera_id });
    }

    fn set_preview_size(&mut self, short_side: u32, long_side: u32) -> Result<(), SessionError> {
        let active = require(&mut self.active, CommandKind::SetPreviewSize)?;
        if active.previewing {
            return Err(SessionError::InvalidState {
                command: CommandKind::SetPreviewSize,
                state: SessionState::Previewing,
            });
        }

        let mut params = active.device.parameters();
        let supported = &params.supported_preview_sizes;
        let Some(size) = select_preview_size(supported, short_side, long_side) else {
            tracing::debug!(
                short_side,
                long_side,
                "No advertised preview size matches, keeping current"
            );
            return Ok(());
        };

        let format = self.config.preview_format;
        let format_supported = params.supports_preview_format(format);
        params.preview_size = Some(size);
        if format_supported {
            params.preview_format = Some(format);
        }
        active.device.set_parameters(&params)?;
        active.preview_size = Some(size);
        tracing::debug!(camera_id = active.id(), size = %size, "Preview size selected");
        self.events.emit(SessionEvent::PreviewSizeSelected(size));

        if !format_supported {
            tracing::warn!(
                format = %format,
                "Preview format unsupported, streaming without callback buffers"
            );
            if let Some(stale) = active.pool.take() {
                stale.retire();
            }
            return Err(SessionError::UnsupportedFormat(format));
        }

        let unchanged = active
            .pool
            .as_ref()
            .is_some_and(|p| p.frame_size() == size && p.format() == format);
        if !unchanged {
            let generation = self.next_generation;
            self.next_generation += 1;
            let mut pool = BufferPool::allocate(size, format, generation);
            for buffer in pool.lend_all() {
                active.device.add_callback_buffer(buffer);
            }
            if let Some(stale) = active.pool.replace(pool) {
                stale.retire();
            }
        }
        Ok(())
    }

    fn set_capture_size(&mut self, short_side: u32, long_side: u32) -> Result<(), SessionError> {
        let active = require(&mut self.active, CommandKind::SetCaptureSize)?;
        let mut params = active.device.parameters();
        let supported = &params.supported_picture_sizes;
        let Some(size) = select_capture_size(supported, short_side, long_side) else {
            tracing::debug!(
                short_side,
                long_side,
                "No advertised picture size matches, keeping current"
            );
            return Ok(());
        };

        params.picture_size = Some(size);
        active.device.set_parameters(&params)?;
        active.capture_size = Some(size);
        tracing::debug!(camera_id = active.id(), size = %size, "Capture size selected");
        self.events.emit(SessionEvent::CaptureSizeSelected(size));
        Ok(())
    }

    fn bind_surface(&mut self, surface: SurfaceRef) -> Result<(), SessionError> {
        let active = require(&mut self.active, CommandKind::BindSurface)?;
        if active.previewing {
            let bound = active.surface.as_ref().map(SurfaceRef::id);
            if bound == Some(surface.id()) {
                return Ok(());
            }
            return Err(SessionError::InvalidState {
                command: CommandKind::BindSurface,
                state: SessionState::Previewing,
            });
        }

        let Some(target) = surface.upgrade() else {
            let reason = format!("surface {} is no longer available", surface.id());
            return Err(SessionError::SurfaceBind(reason));
        };
        active.device.set_preview_display(target.as_ref())?;

        tracing::debug!(
            camera_id = active.id(),
            surface_id = surface.id(),
            size = ?target.size(),
            "Surface bound"
        );
        let surface_id = surface.id();
        active.surface = Some(surface);
        self.events.emit(SessionEvent::SurfaceBound { surface_id });
        Ok(())
    }

    fn unbind_surface(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.previewing {
            active.stop_preview();
            self.events.emit(SessionEvent::PreviewStopped);
        }
        if active.surface.take().is_some() {
            active.device.clear_preview_display();
            tracing::debug!(camera_id = active.id(), "Surface unbound");
            self.events.emit(SessionEvent::SurfaceUnbound);
        }
    }

    fn start_preview(&mut self) -> Result<(), SessionError> {
        let active = require(&mut self.active, CommandKind::StartPreview)?;
        if active.previewing {
            return Ok(());
        }
        match &active.surface {
            Some(surface) if surface.is_alive() => {}
            Some(surface) => {
                let reason = format!("surface {} was dropped", surface.id());
                return Err(SessionError::SurfaceBind(reason));
            }
            None => {
                return Err(SessionError::InvalidState {
                    command: CommandKind::StartPreview,
                    state: SessionState::Open,
                });
            }
        }

        let generation = active.pool.as_ref().map(BufferPool::generation);
        let callback = RecyclingCallback::new(
            generation,
            self.events.clone(),
            self.observer.clone(),
            self.config.emit_frame_events,
        );
        active.device.set_preview_callback(Some(Box::new(callback)));
        if let Err(e) = active.device.start_preview() {
            active.device.set_preview_callback(None);
            return Err(e.into());
        }
        active.previewing = true;

        tracing::info!(
            camera_id = active.id(),
            preview_size = ?active.preview_size,
            generation = ?generation,
            "Preview started"
        );
        self.events.emit(SessionEvent::PreviewStarted);
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), SessionError> {
        let active = require(&mut self.active, CommandKind::StopPreview)?;
        if !active.previewing {
            return Ok(());
        }
        active.stop_preview();
        tracing::info!(camera_id = active.id(), "Preview stopped");
        self.events.emit(SessionEvent::PreviewStopped);
        Ok(())
    }

    fn capture(&mut self) -> Result<(), SessionError> {
        let active = require(&mut self.active, CommandKind::Capture)?;
        // Re-apply so the picture size chosen last is in effect.
        let params = active.device.parameters();
        active.device.set_parameters(&params)?;

        let mut relay = CaptureRelay::new(self.events.clone());
        active.device.take_picture(&mut relay)?;
        tracing::info!(
            camera_id = active.id(),
            capture_size = ?active.capture_size,
            "Picture taken"
        );
        Ok(())
    }

    fn set_display_rotation(&mut self, rotation: Rotation) -> Result<(), SessionError> {
        self.rotation.set(rotation);
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let orientation = compute_compensation(
            active.descriptor.facing(),
            active.descriptor.sensor_orientation(),
            rotation,
        );
        active.device.set_display_orientation(orientation)?;
        tracing::debug!(
            camera_id = active.id(),
            rotation = rotation.degrees(),
            display_orientation = orientation,
            "Display orientation updated"
        );
        Ok(())
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("state", &self.state())
            .field("camera_id", &self.camera_id())
            .field("rotation", &self.rotation.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::PixelFormat;
    use crate::device::{DriverCall, Facing, MockCameraSpec, MockDriver, MockHal, Surface};
    use crate::session::Notification;
    use crossbeam::channel::Receiver;

    struct Fixture {
        session: CameraSession,
        driver: MockDriver,
        events: Receiver<Notification>,
        permission: Permission,
    }

    impl Fixture {
        fn run(&mut self, command: Command) -> Result<(), SessionError> {
            self.session.execute(command)
        }

        fn drain(&self) -> Vec<SessionEvent> {
            self.events.try_iter().map(|n| n.event).collect()
        }

        fn preview(&mut self, surface: &SurfaceRef) {
            self.run(Command::Open { camera_id: 0 }).unwrap();
            self.run(preview_size(1080, 1920)).unwrap();
            self.run(Command::BindSurface(surface.clone())).unwrap();
            self.run(Command::StartPreview).unwrap();
        }
    }

    fn fixture_with(hal: MockHal, config: SessionConfig) -> Fixture {
        let driver = hal.driver();
        let registry = Arc::new(DeviceRegistry::enumerate(&hal));
        let bus = EventBus::new();
        let events = bus.subscribe();
        let permission = Permission::granted();
        let session = CameraSession::new(
            Box::new(hal),
            registry,
            config,
            permission.clone(),
            DisplayRotation::new(Rotation::Deg0),
            bus,
            None,
        );
        Fixture {
            session,
            driver,
            events,
            permission,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockHal::with_default_cameras(), SessionConfig::default())
    }

    fn single_camera(spec: MockCameraSpec) -> Fixture {
        fixture_with(MockHal::new(vec![spec]), SessionConfig::default())
    }

    fn surface() -> (Arc<Surface>, SurfaceRef) {
        let surface = Arc::new(Surface::new(11, 1080, 1920));
        let reference = SurfaceRef::new(&surface);
        (surface, reference)
    }

    fn size(width: u32, height: u32) -> Size {
        Size::new(width, height).unwrap()
    }

    fn preview_size(short_side: u32, long_side: u32) -> Command {
        Command::SetPreviewSize {
            short_side,
            long_side,
        }
    }

    fn capture_size(short_side: u32, long_side: u32) -> Command {
        Command::SetCaptureSize {
            short_side,
            long_side,
        }
    }

    #[test]
    fn test_open_applies_orientation() {
        let mut f = fixture();
        f.run(Command::Open { camera_id: 0 }).unwrap();

        assert_eq!(f.session.state(), SessionState::Open);
        assert_eq!(f.driver.display_orientation(), Some(90));
        assert_eq!(
            f.drain(),
            vec![SessionEvent::DeviceOpened {
                camera_id: 0,
                facing: Facing::Back,
                display_orientation: 90,
            }]
        );
    }

    #[test]
    fn test_open_while_open_is_rejected_without_side_effects() {
        let mut f = fixture();
        f.run(Command::Open { camera_id: 0 }).unwrap();
        let calls_before = f.driver.calls();

        let err = f.run(Command::Open { camera_id: 1 }).unwrap_err();
        assert_eq!(
            err,
            SessionError::ResourceConflict {
                held: 0,
                requested: 1,
            }
        );
        assert_eq!(f.session.camera_id(), Some(0));
        assert_eq!(f.driver.calls(), calls_before);
    }

    #[test]
    fn test_open_without_permission_stays_closed() {
        let mut f = fixture();
        f.permission.set(false);
        let err = f.run(Command::Open { camera_id: 0 }).unwrap_err();
        assert_eq!(err, SessionError::PermissionDenied);
        assert_eq!(f.session.state(), SessionState::Closed);
        assert_eq!(f.driver.opens(), 0);
    }

    #[test]
    fn test_open_unknown_camera() {
        let mut f = fixture();
        let err = f.run(Command::Open { camera_id: 7 }).unwrap_err();
        assert!(matches!(err, SessionError::NoDevice(_)));
        assert_eq!(f.session.state(), SessionState::Closed);
    }

    #[test]
    fn test_preview_lifecycle() {
        let mut f = fixture();
        let (_owner, surface) = surface();
        f.preview(&surface);

        assert_eq!(f.session.state(), SessionState::Previewing);
        let params = f.driver.parameters().unwrap();
        assert_eq!(params.preview_size, Size::new(1920, 1080));
        assert_eq!(f.driver.queued_buffers(), 3);
        assert_eq!(f.driver.preview_display(), Some(11));

        f.run(Command::StopPreview).unwrap();
        assert_eq!(f.session.state(), SessionState::Open);
        assert!(!f.driver.is_previewing());
    }

    #[test]
    fn test_start_preview_without_surface() {
        let mut f = fixture();
        f.run(Command::Open { camera_id: 0 }).unwrap();
        let err = f.run(Command::StartPreview).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidState {
                command: CommandKind::StartPreview,
                state: SessionState::Open,
            }
        );
    }

    #[test]
    fn test_commands_while_closed_are_invalid() {
        let mut f = fixture();
        let needs_device = [
            Command::StartPreview,
            Command::Capture,
            Command::StopPreview,
        ];
        for command in needs_device {
            let kind = command.kind();
            assert_eq!(
                f.run(command).unwrap_err(),
                SessionError::InvalidState {
                    command: kind,
                    state: SessionState::Closed,
                }
            );
        }
        // Close and unbind are idempotent.
        f.run(Command::Close).unwrap();
        f.run(Command::UnbindSurface).unwrap();
    }

    #[test]
    fn test_preview_size_rejected_while_previewing() {
        let mut f = fixture();
        let (_owner, surface) = surface();
        f.preview(&surface);

        let err = f.run(preview_size(480, 640)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
        assert_eq!(f.session.state(), SessionState::Previewing);
    }

    #[test]
    fn test_repeating_same_preview_size_keeps_pool() {
        let mut f = fixture();
        f.run(Command::Open { camera_id: 0 }).unwrap();
        f.run(preview_size(1080, 1920)).unwrap();
        let first = f.session.pool_stats().unwrap();

        f.run(preview_size(1080, 1920)).unwrap();
        let kept = f.session.pool_stats().unwrap();
        assert_eq!(kept.generation(), first.generation());
        assert_eq!(f.driver.queued_buffers(), 3);

        f.run(preview_size(480, 640)).unwrap();
        let second = f.session.pool_stats().unwrap();
        assert!(second.generation() > first.generation());
        assert_eq!(f.driver.queued_buffers(), 3);
        assert_eq!(second.with_driver(), 3);

        // The driver dropped the first generation on the stream change.
        assert!(first.is_retired());
        assert_eq!(first.with_driver(), 0);
        assert_eq!(first.discarded(), 3);
    }

    #[test]
    fn test_no_matching_sizes_keeps_current_configuration() {
        let spec = MockCameraSpec::new(Facing::Back, 90)
            .with_preview_sizes(vec![size(1440, 1080), size(640, 480)])
            .with_picture_sizes(vec![size(4032, 3024)]);
        let mut f = single_camera(spec);
        f.run(Command::Open { camera_id: 0 }).unwrap();
        f.drain();

        f.run(preview_size(1080, 1920)).unwrap();
        f.run(capture_size(1080, 1920)).unwrap();
        assert!(f.drain().is_empty());
        assert!(f.session.pool_stats().is_none());
        let params = f.driver.parameters().unwrap();
        assert_eq!(params.preview_size, Size::new(1440, 1080));
        assert_eq!(params.picture_size, Size::new(4032, 3024));

        f.run(capture_size(3024, 4032)).unwrap();
        let selected = SessionEvent::CaptureSizeSelected(size(4032, 3024));
        assert_eq!(f.drain(), vec![selected]);
    }

    #[test]
    fn test_unsupported_format_skips_pool() {
        let spec = MockCameraSpec::new(Facing::Back, 90)
            .with_preview_formats(vec![PixelFormat::Yuy2]);
        let mut f = single_camera(spec);
        let (_owner, surface) = surface();
        f.run(Command::Open { camera_id: 0 }).unwrap();

        let err = f.run(preview_size(1080, 1920)).unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFormat(_)));
        assert!(f.session.pool_stats().is_none());

        // Preview still runs, just without callback buffers.
        f.run(Command::BindSurface(surface)).unwrap();
        f.run(Command::StartPreview).unwrap();
        assert_eq!(f.session.state(), SessionState::Previewing);
        assert_eq!(f.driver.queued_buffers(), 0);
    }

    #[test]
    fn test_surface_bind_failure_stays_open() {
        let mut f = single_camera(MockCameraSpec::new(Facing::Back, 90).with_failing_surface());
        let (_owner, surface) = surface();
        f.run(Command::Open { camera_id: 0 }).unwrap();

        let err = f.run(Command::BindSurface(surface)).unwrap_err();
        assert!(matches!(err, SessionError::SurfaceBind(_)));
        assert_eq!(f.session.state(), SessionState::Open);
    }

    #[test]
    fn test_dropped_surface_cannot_bind() {
        let mut f = fixture();
        let (owner, surface) = surface();
        f.run(Command::Open { camera_id: 0 }).unwrap();
        drop(owner);
        let err = f.run(Command::BindSurface(surface)).unwrap_err();
        assert!(matches!(err, SessionError::SurfaceBind(_)));
    }

    #[test]
    fn test_unbind_stops_preview() {
        let mut f = fixture();
        let (_owner, surface) = surface();
        f.preview(&surface);
        f.drain();

        f.run(Command::UnbindSurface).unwrap();
        assert_eq!(f.session.state(), SessionState::Open);
        assert_eq!(f.driver.preview_display(), None);
        assert_eq!(
            f.drain(),
            vec![SessionEvent::PreviewStopped, SessionEvent::SurfaceUnbound]
        );
    }

    #[test]
    fn test_capture_stages_in_order() {
        let mut f = fixture();
        let (_owner, surface) = surface();
        f.preview(&surface);
        f.run(capture_size(1080, 1920)).unwrap();
        f.drain();

        f.run(Command::Capture).unwrap();
        let events = f.drain();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], SessionEvent::ShutterFired);
        assert!(matches!(events[1], SessionEvent::RawAvailable(_)));
        assert!(matches!(events[2], SessionEvent::PostviewAvailable(_)));
        assert!(matches!(events[3], SessionEvent::ImageAvailable(_)));
        assert_eq!(f.session.state(), SessionState::Previewing);
    }

    #[test]
    fn test_close_releases_and_is_idempotent() {
        let mut f = fixture();
        let (_owner, surface) = surface();
        f.preview(&surface);

        f.run(Command::Close).unwrap();
        f.run(Command::Close).unwrap();
        assert_eq!(f.session.state(), SessionState::Closed);
        assert_eq!(f.driver.releases(), 1);
        assert_eq!(f.driver.open_camera(), None);
        let tail = [DriverCall::StopPreview, DriverCall::Release(0)];
        assert!(f.driver.calls().ends_with(&tail));
    }

    #[test]
    fn test_close_writes_off_queued_buffers() {
        let mut f = fixture();
        let (_owner, surface) = surface();
        f.preview(&surface);
        assert_eq!(f.driver.pump_frames(5), 5);
        let stats = f.session.pool_stats().unwrap();
        assert_eq!(stats.with_driver(), 3);

        f.run(Command::Close).unwrap();
        assert!(f.session.pool_stats().is_none());
        assert_eq!(stats.with_driver(), 0);
        assert_eq!(stats.recycled(), 5);
        assert_eq!(stats.discarded(), 3);
    }

    #[test]
    fn test_rotation_reapplied_to_open_device() {
        let mut f = fixture();
        f.run(Command::Open { camera_id: 1 }).unwrap();
        assert_eq!(f.driver.display_orientation(), Some(90));

        f.run(Command::SetDisplayRotation(Rotation::Deg90)).unwrap();
        assert_eq!(f.driver.display_orientation(), Some(0));
    }

    #[test]
    fn test_frames_recycle_through_three_buffers() {
        let mut f = fixture();
        let (_owner, surface) = surface();
        f.preview(&surface);

        assert_eq!(f.driver.pump_frames(20), 20);
        let stats = f.session.pool_stats().unwrap();
        assert_eq!(stats.delivered(), 20);
        assert_eq!(stats.recycled(), 20);
        assert_eq!(stats.peak_with_driver(), 3);
        assert_eq!(f.driver.starved_frames(), 0);
    }
}
