//! Camera Session Manager Library
//!
//! Drives one physical camera on behalf of an interactive application:
//! opening front or back cameras, fitting preview and capture resolutions
//! to a display target, compensating for sensor and screen rotation,
//! recycling preview frame buffers, and taking still pictures.
//!
//! # Architecture
//!
//! Every hardware call is serialized onto one worker thread:
//!
//! ```text
//! host lifecycle → SessionController ┐
//!                                    ├→ CommandQueue → worker (CameraSession) → CameraDevice
//! direct commands → SessionManager   ┘                    │
//!                                                         ↓
//!                               SessionEvent notifications + SessionSnapshot
//! ```
//!
//! # Design Principles
//!
//! - **One owner**: only the worker touches the device, surface and buffer pool
//! - **Ordered**: commands run in submission order, batches are never interleaved
//! - **Reported, not fatal**: hardware failures become error notifications
//! - **Fixed memory**: three preview buffers per configuration, reused every frame
//!
//! # Example
//!
//! ```no_run
//! use camera_session::{
//!     device::{MockHal, Surface, SurfaceRef},
//!     session::{Command, SessionManager},
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let manager = SessionManager::builder(Box::new(MockHal::with_default_cameras()))
//!     .build()
//!     .unwrap();
//! let events = manager.subscribe();
//!
//! let surface = Arc::new(Surface::new(1, 1080, 1920));
//! manager
//!     .submit_batch([
//!         Command::Open { camera_id: 0 },
//!         Command::SetPreviewSize { short_side: 1080, long_side: 1920 },
//!         Command::BindSurface(SurfaceRef::new(&surface)),
//!         Command::StartPreview,
//!         Command::Capture,
//!     ])
//!     .unwrap();
//!
//! manager.wait_idle(Duration::from_secs(1));
//! for notification in events.try_iter() {
//!     println!("{:?}", notification.event);
//! }
//! manager.shutdown();
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod buffers;
pub mod config;
pub mod device;
pub mod geometry;
pub mod metrics;
pub mod session;

// Re-export commonly used types at crate root
pub use buffers::{BufferPool, FrameBuffer, PixelFormat, PoolStats};
pub use config::{ConfigError, FileConfig, SessionConfig};
pub use device::{CameraDescriptor, CameraHal, DeviceRegistry, Facing, MockHal, Size, SurfaceRef};
pub use geometry::{
    compute_compensation, select_capture_size, select_preview_size, DisplayRotation, Rotation,
};
pub use session::{
    Command, CommandKind, SessionController, SessionError, SessionEvent, SessionManager,
    SessionSnapshot, SessionState,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
