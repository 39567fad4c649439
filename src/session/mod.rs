//! Serialized camera session.
//!
//! Every hardware call happens on one worker thread that drains an ordered
//! command queue. Callers submit [`Command`]s (or drive a
//! [`SessionController`] from their lifecycle callbacks) and learn about
//! outcomes through [`SessionEvent`] notifications and the published
//! [`SessionSnapshot`].
//!
//! ```text
//! submitters ──► CommandQueue ──► worker: CameraSession ──► CameraDevice
//!                                      │                         │
//!                                      ▼                         ▼
//!                                  EventBus ◄──── frame / capture callbacks
//! ```

mod command;
mod controller;
mod error;
mod events;
mod hooks;
mod machine;
mod preview;
mod queue;
mod state;
mod worker;

pub use command::{Command, CommandKind};
pub use controller::SessionController;
pub use error::SessionError;
pub use events::{EventBus, Notification, SessionEvent};
pub use hooks::{FrameObserver, Permission};
pub use machine::CameraSession;
pub use queue::{CommandQueue, Envelope};
pub use state::{SessionSnapshot, SessionState};
pub use worker::{SessionManager, SessionManagerBuilder};
