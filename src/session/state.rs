//! Session states and the cached snapshot exposed to other threads.

use crate::buffers::PoolStats;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of the camera session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No device is held.
    #[default]
    Closed,
    /// A device is held and configurable.
    Open,
    /// A device is held and streaming preview frames into a bound surface.
    Previewing,
}

impl SessionState {
    fn as_u8(self) -> u8 {
        match self {
            SessionState::Closed => 0,
            SessionState::Open => 1,
            SessionState::Previewing => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Open,
            2 => SessionState::Previewing,
            _ => SessionState::Closed,
        }
    }

    /// Numeric value exported as a metric.
    pub fn metric_value(self) -> i64 {
        i64::from(self.as_u8())
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Closed => f.write_str("closed"),
            SessionState::Open => f.write_str("open"),
            SessionState::Previewing => f.write_str("previewing"),
        }
    }
}

/// Read-only view of the session, published by the worker after every
/// command.
///
/// Values are eventually consistent: a command may already be queued that
/// will change them. Treat them as hints, not as authoritative state.
#[derive(Debug)]
pub struct SessionSnapshot {
    state: AtomicU8,
    /// Open camera id, or -1.
    camera_id: AtomicI64,
    commands_executed: AtomicU64,
    command_errors: AtomicU64,
    captures: AtomicU64,
    pool: RwLock<Option<Arc<PoolStats>>>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Closed.as_u8()),
            camera_id: AtomicI64::new(-1),
            commands_executed: AtomicU64::new(0),
            command_errors: AtomicU64::new(0),
            captures: AtomicU64::new(0),
            pool: RwLock::new(None),
        }
    }
}

impl SessionSnapshot {
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Camera held at the last publish, if any.
    pub fn open_camera(&self) -> Option<u32> {
        u32::try_from(self.camera_id.load(Ordering::Acquire)).ok()
    }

    pub fn commands_executed(&self) -> u64 {
        self.commands_executed.load(Ordering::Relaxed)
    }

    pub fn command_errors(&self) -> u64 {
        self.command_errors.load(Ordering::Relaxed)
    }

    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::Relaxed)
    }

    /// Accounting for the current preview buffer pool, if one exists.
    pub fn pool_stats(&self) -> Option<Arc<PoolStats>> {
        self.pool.read().clone()
    }

    pub(crate) fn publish(
        &self,
        state: SessionState,
        camera_id: Option<u32>,
        pool: Option<Arc<PoolStats>>,
    ) {
        self.state.store(state.as_u8(), Ordering::Release);
        self.camera_id
            .store(camera_id.map_or(-1, i64::from), Ordering::Release);
        *self.pool.write() = pool;
    }

    pub(crate) fn record_command(&self, failed: bool) {
        self.commands_executed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.command_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_capture(&self) {
        self.captures.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_closed() {
        let snapshot = SessionSnapshot::default();
        assert_eq!(snapshot.state(), SessionState::Closed);
        assert_eq!(snapshot.open_camera(), None);
        assert!(snapshot.pool_stats().is_none());
    }

    #[test]
    fn test_publish_round_trip() {
        let snapshot = SessionSnapshot::default();
        snapshot.publish(SessionState::Previewing, Some(1), None);
        assert_eq!(snapshot.state(), SessionState::Previewing);
        assert_eq!(snapshot.open_camera(), Some(1));

        snapshot.publish(SessionState::Closed, None, None);
        assert_eq!(snapshot.open_camera(), None);
    }
}
