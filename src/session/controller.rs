//! Host lifecycle mapped onto command sequences.
//!
//! Hosts report lifecycle and surface callbacks; the controller turns each
//! into the command or batch the worker should run.

use super::command::{Command, CommandKind};
use super::hooks::Permission;
use super::queue::CommandQueue;
use super::state::SessionSnapshot;
use super::SessionError;
use crate::device::{DeviceRegistry, Facing, SurfaceRef};
use crate::geometry::Rotation;
use parking_lot::Mutex;
use std::sync::Arc;

/// Display target most recently reported by the host.
#[derive(Debug, Clone)]
struct SurfaceBinding {
    surface: SurfaceRef,
    short_side: u32,
    long_side: u32,
}

impl SurfaceBinding {
    fn configure_commands(&self) -> [Command; 4] {
        [
            Command::SetPreviewSize {
                short_side: self.short_side,
                long_side: self.long_side,
            },
            Command::SetCaptureSize {
                short_side: self.short_side,
                long_side: self.long_side,
            },
            Command::BindSurface(self.surface.clone()),
            Command::StartPreview,
        ]
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    binding: Option<SurfaceBinding>,
    /// Camera chosen by the last switch, reopened on resume.
    preferred: Option<u32>,
}

/// Cloneable handle for host lifecycle callbacks.
#[derive(Debug, Clone)]
pub struct SessionController {
    queue: CommandQueue,
    registry: Arc<DeviceRegistry>,
    snapshot: Arc<SessionSnapshot>,
    permission: Permission,
    default_facing: Facing,
    state: Arc<Mutex<ControllerState>>,
}

impl SessionController {
    pub(crate) fn new(
        queue: CommandQueue,
        registry: Arc<DeviceRegistry>,
        snapshot: Arc<SessionSnapshot>,
        permission: Permission,
        default_facing: Facing,
    ) -> Self {
        Self {
            queue,
            registry,
            snapshot,
            permission,
            default_facing,
            state: Arc::new(Mutex::new(ControllerState::default())),
        }
    }

    /// Host came to the foreground: open the preferred camera.
    ///
    /// Fails without queueing anything when permission is missing.
    pub fn resume(&self) -> Result<u64, SessionError> {
        if !self.permission.is_granted() {
            tracing::warn!("Camera permission missing, not opening");
            return Err(SessionError::PermissionDenied);
        }
        let camera_id = match self.state.lock().preferred {
            Some(id) => id,
            None => self.default_camera()?,
        };
        tracing::debug!(camera_id, "Resuming camera session");
        self.queue.submit(Command::Open { camera_id })
    }

    fn default_camera(&self) -> Result<u32, SessionError> {
        let descriptor = match self.registry.first_with_facing(self.default_facing) {
            Some(descriptor) => descriptor,
            None => self.registry.default_camera()?,
        };
        Ok(descriptor.id())
    }

    /// Host went to the background: drop any open that has not started yet
    /// and release the camera.
    pub fn pause(&self) -> Result<u64, SessionError> {
        let cancelled = self.queue.remove_pending(CommandKind::Open);
        tracing::debug!(cancelled, "Pausing camera session");
        self.queue.submit(Command::Close)
    }

    /// The display target was created or resized.
    pub fn surface_changed(
        &self,
        surface: SurfaceRef,
        width: u32,
        height: u32,
    ) -> Result<Vec<u64>, SessionError> {
        let binding = SurfaceBinding {
            surface,
            short_side: width.min(height),
            long_side: width.max(height),
        };
        let commands = binding.configure_commands();
        self.state.lock().binding = Some(binding);
        self.queue.submit_batch(commands)
    }

    /// The display target is going away.
    pub fn surface_destroyed(&self) -> Result<u64, SessionError> {
        self.state.lock().binding = None;
        self.queue.submit(Command::UnbindSurface)
    }

    /// Reopens on the camera facing the other way.
    ///
    /// Uses the last published snapshot to find the current camera.
    pub fn switch_camera(&self) -> Result<Vec<u64>, SessionError> {
        let current = self
            .snapshot
            .open_camera()
            .ok_or_else(|| SessionError::NoDevice("no camera is open to switch from".into()))?;
        let target = self.registry.switch_target(current)?;

        let camera_id = target.id();
        let mut state = self.state.lock();
        state.preferred = Some(camera_id);
        let mut commands = vec![
            Command::StopPreview,
            Command::Close,
            Command::Open { camera_id },
        ];
        if let Some(binding) = &state.binding {
            commands.extend(binding.configure_commands());
        }
        drop(state);

        tracing::info!(
            from = current,
            to = camera_id,
            facing = %target.facing(),
            "Switching camera"
        );
        self.queue.submit_batch(commands)
    }

    pub fn set_display_rotation(&self, rotation: Rotation) -> Result<u64, SessionError> {
        self.queue.submit(Command::SetDisplayRotation(rotation))
    }

    pub fn capture(&self) -> Result<u64, SessionError> {
        self.queue.submit(Command::Capture)
    }
}
