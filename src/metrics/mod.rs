//! Prometheus metrics exporter for camera session monitoring.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `camera_session_state` - Current state (0=closed, 1=open, 2=previewing)
//! - `camera_session_open_camera` - Open camera id, -1 when closed
//! - `camera_session_commands_total` - Commands executed by the worker
//! - `camera_session_command_errors_total` - Commands that reported an error
//! - `camera_session_captures_total` - Still captures completed
//!
//! ## Buffer Pool Metrics
//! These describe the live preview pool and reset when it is replaced.
//! - `camera_session_pool_generation` - Generation of the live pool
//! - `camera_session_pool_buffers_with_driver` - Buffers queued with the driver
//! - `camera_session_pool_peak_buffers_with_driver` - Peak of the above
//! - `camera_session_pool_frames_delivered` - Frames delivered
//! - `camera_session_pool_frames_recycled` - Buffers returned to the driver
//! - `camera_session_pool_frames_discarded` - Stale buffers dropped
//!
//! # Example
//!
//! ```no_run
//! use camera_session::metrics::{MetricsRegistry, MetricsSnapshot};
//! use camera_session::session::SessionSnapshot;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let session = SessionSnapshot::default();
//!
//! registry.update(&MetricsSnapshot::from_components(&session));
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
