//! Commands accepted by the session worker.

use super::SessionError;
use crate::device::SurfaceRef;
use crate::geometry::Rotation;
use std::fmt;

/// A unit of work for the camera worker. Immutable once submitted.
#[derive(Debug, Clone)]
pub enum Command {
    /// Open the camera with this platform id.
    Open { camera_id: u32 },
    /// Release the open camera, if any.
    Close,
    /// Choose a preview size for a target of `short_side` x `long_side`.
    SetPreviewSize { short_side: u32, long_side: u32 },
    /// Choose a still-capture size for a target of `short_side` x `long_side`.
    SetCaptureSize { short_side: u32, long_side: u32 },
    /// Attach the preview to a display target.
    BindSurface(SurfaceRef),
    /// Detach the preview after its display target went away.
    UnbindSurface,
    StartPreview,
    StopPreview,
    /// Take a still picture.
    Capture,
    /// Record a new display rotation and re-apply compensation.
    SetDisplayRotation(Rotation),
}

/// Discriminant of a [`Command`], used for logging and cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Open,
    Close,
    SetPreviewSize,
    SetCaptureSize,
    BindSurface,
    UnbindSurface,
    StartPreview,
    StopPreview,
    Capture,
    SetDisplayRotation,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Open { .. } => CommandKind::Open,
            Command::Close => CommandKind::Close,
            Command::SetPreviewSize { .. } => CommandKind::SetPreviewSize,
            Command::SetCaptureSize { .. } => CommandKind::SetCaptureSize,
            Command::BindSurface(_) => CommandKind::BindSurface,
            Command::UnbindSurface => CommandKind::UnbindSurface,
            Command::StartPreview => CommandKind::StartPreview,
            Command::StopPreview => CommandKind::StopPreview,
            Command::Capture => CommandKind::Capture,
            Command::SetDisplayRotation(_) => CommandKind::SetDisplayRotation,
        }
    }

    /// Parses one step of a textual command script.
    ///
    /// Steps look like `open:1`, `preview-size:1080x1920`, `bind`, `start`,
    /// `capture`, `rotate:90`. `bind` attaches `surface`. Anything else is an
    /// [`SessionError::IllegalCommand`].
    pub fn parse(step: &str, surface: &SurfaceRef) -> Result<Self, SessionError> {
        let step = step.trim();
        let illegal = || SessionError::IllegalCommand(step.to_string());
        let (name, arg) = match step.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (step, None),
        };

        let dimensions = |arg: Option<&str>| -> Result<(u32, u32), SessionError> {
            let (a, b) = arg.and_then(|a| a.split_once('x')).ok_or_else(illegal)?;
            let a: u32 = a.trim().parse().map_err(|_| illegal())?;
            let b: u32 = b.trim().parse().map_err(|_| illegal())?;
            Ok((a.min(b), a.max(b)))
        };

        let command = match (name, arg) {
            ("open", Some(id)) => Command::Open {
                camera_id: id.parse().map_err(|_| illegal())?,
            },
            ("close", None) => Command::Close,
            ("preview-size", arg) => {
                let (short_side, long_side) = dimensions(arg)?;
                Command::SetPreviewSize {
                    short_side,
                    long_side,
                }
            }
            ("capture-size", arg) => {
                let (short_side, long_side) = dimensions(arg)?;
                Command::SetCaptureSize {
                    short_side,
                    long_side,
                }
            }
            ("bind", None) => Command::BindSurface(surface.clone()),
            ("unbind", None) => Command::UnbindSurface,
            ("start", None) => Command::StartPreview,
            ("stop", None) => Command::StopPreview,
            ("capture", None) => Command::Capture,
            ("rotate", Some(degrees)) => {
                let degrees = degrees.parse().map_err(|_| illegal())?;
                Command::SetDisplayRotation(Rotation::from_degrees(degrees))
            }
            _ => return Err(illegal()),
        };
        Ok(command)
    }

    /// Parses a comma-separated script, failing on the first illegal step.
    pub fn parse_script(script: &str, surface: &SurfaceRef) -> Result<Vec<Self>, SessionError> {
        script
            .split(',')
            .filter(|step| !step.trim().is_empty())
            .map(|step| Command::parse(step, surface))
            .collect()
    }
}

impl CommandKind {
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Open => "Open",
            CommandKind::Close => "Close",
            CommandKind::SetPreviewSize => "SetPreviewSize",
            CommandKind::SetCaptureSize => "SetCaptureSize",
            CommandKind::BindSurface => "BindSurface",
            CommandKind::UnbindSurface => "UnbindSurface",
            CommandKind::StartPreview => "StartPreview",
            CommandKind::StopPreview => "StopPreview",
            CommandKind::Capture => "Capture",
            CommandKind::SetDisplayRotation => "SetDisplayRotation",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
