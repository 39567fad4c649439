//! Session error taxonomy.

use super::command::CommandKind;
use super::state::SessionState;
use crate::buffers::PixelFormat;
use crate::device::DeviceError;
use thiserror::Error;

/// Errors reported by the session.
///
/// Failures inside the worker are turned into [`SessionEvent::Error`]
/// notifications rather than crossing back to the submitter, so this type
/// is `Clone` to fan out to every subscriber.
///
/// [`SessionEvent::Error`]: super::SessionEvent::Error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("camera permission has not been granted")]
    PermissionDenied,

    #[error("no camera device: {0}")]
    NoDevice(String),

    #[error("camera {held} is already open; close it before opening {requested}")]
    ResourceConflict { held: u32, requested: u32 },

    #[error("preview format {0} is not supported by the device")]
    UnsupportedFormat(PixelFormat),

    #[error("failed to bind preview surface: {0}")]
    SurfaceBind(String),

    #[error("illegal command: {0:?}")]
    IllegalCommand(String),

    #[error("{command} is not valid while the session is {state}")]
    InvalidState {
        command: CommandKind,
        state: SessionState,
    },

    #[error("camera device error: {0}")]
    Device(String),

    #[error("command queue is shut down")]
    QueueClosed,

    #[error("failed to start camera worker: {0}")]
    Worker(String),
}

impl SessionError {
    /// True for errors that indicate a defect in the caller rather than an
    /// external condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::IllegalCommand(_))
    }
}

impl From<DeviceError> for SessionError {
    fn from(error: DeviceError) -> Self {
        match error {
            DeviceError::NoDevice(reason) => SessionError::NoDevice(reason),
            DeviceError::Io(e) => SessionError::SurfaceBind(e.to_string()),
            other => SessionError::Device(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_mapping() {
        let no_device: SessionError = DeviceError::NoDevice("none".into()).into();
        assert_eq!(no_device, SessionError::NoDevice("none".into()));

        let io: SessionError =
            DeviceError::Io(std::io::Error::new(std::io::ErrorKind::Other, "gone")).into();
        assert!(matches!(io, SessionError::SurfaceBind(_)));

        let open: SessionError = DeviceError::OpenFailed {
            id: 1,
            reason: "busy".into(),
        }
        .into();
        assert!(matches!(open, SessionError::Device(_)));
    }

    #[test]
    fn test_only_illegal_command_is_fatal() {
        assert!(SessionError::IllegalCommand("zoom".into()).is_fatal());
        let conflict = SessionError::ResourceConflict {
            held: 0,
            requested: 1,
        };
        assert!(!conflict.is_fatal());
        assert!(!SessionError::PermissionDenied.is_fatal());
    }
}
