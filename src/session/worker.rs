//! The camera worker thread and its owning handle.

use super::command::{Command, CommandKind};
use super::controller::SessionController;
use super::events::{EventBus, Notification, SessionEvent};
use super::hooks::{FrameObserver, Permission};
use super::machine::CameraSession;
use super::queue::CommandQueue;
use super::state::SessionSnapshot;
use super::SessionError;
use crate::config::SessionConfig;
use crate::device::{CameraHal, DeviceRegistry};
use crate::geometry::DisplayRotation;
use crossbeam::channel::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configures and starts a [`SessionManager`].
pub struct SessionManagerBuilder {
    hal: Box<dyn CameraHal>,
    config: SessionConfig,
    permission: Permission,
    rotation: Option<DisplayRotation>,
    observer: Option<Arc<dyn FrameObserver>>,
}

impl SessionManagerBuilder {
    pub fn new(hal: Box<dyn CameraHal>) -> Self {
        Self {
            hal,
            config: SessionConfig::default(),
            permission: Permission::granted(),
            rotation: None,
            observer: None,
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Permission cell the host updates after prompting the user. Defaults
    /// to granted.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    /// Shared display rotation. Defaults to the configured rotation.
    pub fn rotation(mut self, rotation: DisplayRotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Observer that sees every preview frame before its buffer is recycled.
    pub fn observer(mut self, observer: Arc<dyn FrameObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Enumerates cameras and spawns the worker.
    pub fn build(self) -> Result<SessionManager, SessionError> {
        let registry = Arc::new(DeviceRegistry::enumerate(self.hal.as_ref()));
        let rotation = self
            .rotation
            .unwrap_or_else(|| DisplayRotation::new(self.config.rotation()));
        let events = EventBus::new();
        let queue = CommandQueue::new();
        let snapshot = Arc::new(SessionSnapshot::default());

        let session = CameraSession::new(
            self.hal,
            Arc::clone(&registry),
            self.config.clone(),
            self.permission.clone(),
            rotation.clone(),
            events.clone(),
            self.observer,
        );

        let worker = Worker {
            session,
            queue: queue.clone(),
            events: events.clone(),
            snapshot: Arc::clone(&snapshot),
        };
        let handle = thread::Builder::new()
            .name("camera-worker".into())
            .spawn(move || worker.run())
            .map_err(|e| SessionError::Worker(e.to_string()))?;

        tracing::info!(
            cameras = registry.descriptors().len(),
            "Camera worker started"
        );

        Ok(SessionManager {
            queue,
            events,
            snapshot,
            registry,
            config: self.config,
            permission: self.permission,
            rotation,
            handle: Some(handle),
        })
    }
}

struct Worker {
    session: CameraSession,
    queue: CommandQueue,
    events: EventBus,
    snapshot: Arc<SessionSnapshot>,
}

impl Worker {
    fn run(mut self) {
        while let Some(envelope) = self.queue.next() {
            let kind = envelope.command.kind();
            let result = self.session.execute(envelope.command);

            match &result {
                Ok(()) => {
                    if kind == CommandKind::Capture {
                        self.snapshot.record_capture();
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        sequence = envelope.sequence,
                        command = %kind,
                        state = %self.session.state(),
                        error = %error,
                        "Command failed"
                    );
                    self.events.emit(SessionEvent::Error {
                        kind,
                        error: error.clone(),
                    });
                }
            }
            self.snapshot.record_command(result.is_err());
            self.publish();
            self.events.emit(SessionEvent::CommandCompleted {
                sequence: envelope.sequence,
                kind,
            });
            self.queue.complete();
        }

        self.session.shutdown();
        self.publish();
        tracing::info!("Camera worker stopped");
    }

    fn publish(&self) {
        self.snapshot.publish(
            self.session.state(),
            self.session.camera_id(),
            self.session.pool_stats(),
        );
    }
}

/// Owns the camera worker and the queue feeding it.
///
/// Dropping the manager closes the queue, lets queued commands finish,
/// releases any held camera and joins the worker.
pub struct SessionManager {
    queue: CommandQueue,
    events: EventBus,
    snapshot: Arc<SessionSnapshot>,
    registry: Arc<DeviceRegistry>,
    config: SessionConfig,
    permission: Permission,
    rotation: DisplayRotation,
    handle: Option<JoinHandle<()>>,
}

impl SessionManager {
    pub fn builder(hal: Box<dyn CameraHal>) -> SessionManagerBuilder {
        SessionManagerBuilder::new(hal)
    }

    /// Queues a command and returns its sequence number.
    pub fn submit(&self, command: Command) -> Result<u64, SessionError> {
        self.queue.submit(command)
    }

    /// Queues commands contiguously.
    pub fn submit_batch(
        &self,
        commands: impl IntoIterator<Item = Command>,
    ) -> Result<Vec<u64>, SessionError> {
        self.queue.submit_batch(commands)
    }

    /// Removes queued commands of `kind` that have not started yet.
    pub fn cancel_pending(&self, kind: CommandKind) -> usize {
        self.queue.remove_pending(kind)
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.events.subscribe()
    }

    /// Last state published by the worker.
    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn snapshot_handle(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Cameras found when the manager started.
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Permission cell read by the worker on every open.
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    /// Display rotation read by the worker on every open.
    pub fn rotation(&self) -> &DisplayRotation {
        &self.rotation
    }

    /// Waits for every queued command to finish.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.queue.wait_idle(timeout)
    }

    /// Lifecycle façade bound to this manager.
    pub fn controller(&self) -> SessionController {
        SessionController::new(
            self.queue.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.snapshot),
            self.permission.clone(),
            self.config.default_facing,
        )
    }

    /// Drains the queue, releases the camera and joins the worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.queue.close();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Camera worker panicked");
            }
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.snapshot.state())
            .field("camera_id", &self.snapshot.open_camera())
            .field("pending", &self.queue.pending_len())
            .finish()
    }
}
