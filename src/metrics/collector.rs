//! Metrics collection and registry.

use crate::session::SessionSnapshot;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Numeric session state (0=closed, 1=open, 2=previewing).
    pub session_state: i64,
    /// Open camera id, or -1.
    pub open_camera: i64,
    /// Commands run by the worker.
    pub commands_executed: u64,
    /// Commands that reported an error.
    pub command_errors: u64,
    /// Still captures completed.
    pub captures: u64,
    /// Generation of the live buffer pool, 0 when there is none.
    pub pool_generation: u64,
    /// Buffers currently queued with the driver.
    pub buffers_with_driver: usize,
    /// Most buffers ever queued with the driver at once.
    pub peak_buffers_with_driver: usize,
    /// Frames delivered from the live pool.
    pub frames_delivered: u64,
    /// Frames whose buffer went back to the driver.
    pub frames_recycled: u64,
    /// Stale buffers dropped.
    pub frames_discarded: u64,
}

/// Prometheus metrics registry for camera session monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    session_state: IntGauge,
    open_camera: IntGauge,
    commands_total: IntCounter,
    command_errors_total: IntCounter,
    captures_total: IntCounter,

    // Buffer pool metrics
    pool_generation: IntGauge,
    buffers_with_driver: IntGauge,
    peak_buffers_with_driver: IntGauge,
    frames_delivered: IntGauge,
    frames_recycled: IntGauge,
    frames_discarded: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let session_state = IntGauge::new(
            "camera_session_state",
            "Current session state (0=closed, 1=open, 2=previewing)",
        )?;
        let open_camera = IntGauge::new(
            "camera_session_open_camera",
            "Open camera id (-1 when closed)",
        )?;
        let commands_total = IntCounter::new(
            "camera_session_commands_total",
            "Total commands executed",
        )?;
        let command_errors_total = IntCounter::new(
            "camera_session_command_errors_total",
            "Total commands that reported an error",
        )?;
        let captures_total = IntCounter::new(
            "camera_session_captures_total",
            "Total still captures completed",
        )?;

        // Pool gauges reset whenever the preview configuration changes.
        let pool_generation = IntGauge::new(
            "camera_session_pool_generation",
            "Generation of the live preview buffer pool",
        )?;
        let buffers_with_driver = IntGauge::new(
            "camera_session_pool_buffers_with_driver",
            "Preview buffers currently queued with the driver",
        )?;
        let peak_buffers_with_driver = IntGauge::new(
            "camera_session_pool_peak_buffers_with_driver",
            "Most preview buffers queued with the driver at once",
        )?;
        let frames_delivered = IntGauge::new(
            "camera_session_pool_frames_delivered",
            "Preview frames delivered from the live pool",
        )?;
        let frames_recycled = IntGauge::new(
            "camera_session_pool_frames_recycled",
            "Preview buffers returned to the driver from the live pool",
        )?;
        let frames_discarded = IntGauge::new(
            "camera_session_pool_frames_discarded",
            "Stale preview buffers dropped instead of re-queued",
        )?;

        registry.register(Box::new(session_state.clone()))?;
        registry.register(Box::new(open_camera.clone()))?;
        registry.register(Box::new(commands_total.clone()))?;
        registry.register(Box::new(command_errors_total.clone()))?;
        registry.register(Box::new(captures_total.clone()))?;
        registry.register(Box::new(pool_generation.clone()))?;
        registry.register(Box::new(buffers_with_driver.clone()))?;
        registry
            .register(Box::new(peak_buffers_with_driver.clone()))?;
        registry.register(Box::new(frames_delivered.clone()))?;
        registry.register(Box::new(frames_recycled.clone()))?;
        registry.register(Box::new(frames_discarded.clone()))?;

        Ok(Self {
            registry,
            session_state,
            open_camera,
            commands_total,
            command_errors_total,
            captures_total,
            pool_generation,
            buffers_with_driver,
            peak_buffers_with_driver,
            frames_delivered,
            frames_recycled,
            frames_discarded,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.session_state.set(snapshot.session_state);
        self.open_camera.set(snapshot.open_camera);

        // Counters only move forward by the difference
        advance(&self.commands_total, snapshot.commands_executed);
        advance(&self.command_errors_total, snapshot.command_errors);
        advance(&self.captures_total, snapshot.captures);

        self.pool_generation.set(snapshot.pool_generation as i64);
        self.buffers_with_driver
            .set(snapshot.buffers_with_driver as i64);
        self.peak_buffers_with_driver
            .set(snapshot.peak_buffers_with_driver as i64);
        self.frames_delivered.set(snapshot.frames_delivered as i64);
        self.frames_recycled.set(snapshot.frames_recycled as i64);
        self.frames_discarded.set(snapshot.frames_discarded as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the state published by the session worker.
    pub fn from_components(session: &SessionSnapshot) -> Self {
        let mut snapshot = Self {
            session_state: session.state().metric_value(),
            open_camera: session.open_camera().map_or(-1, i64::from),
            commands_executed: session.commands_executed(),
            command_errors: session.command_errors(),
            captures: session.captures(),
            ..Default::default()
        };

        if let Some(pool) = session.pool_stats() {
            snapshot.pool_generation = pool.generation();
            snapshot.buffers_with_driver = pool.with_driver();
            snapshot.peak_buffers_with_driver = pool.peak_with_driver();
            snapshot.frames_delivered = pool.delivered();
            snapshot.frames_recycled = pool.recycled();
            snapshot.frames_discarded = pool.discarded();
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = MetricsSnapshot {
            session_state: 2,
            open_camera: 1,
            commands_executed: 7,
            command_errors: 1,
            captures: 2,
            pool_generation: 3,
            buffers_with_driver: 3,
            peak_buffers_with_driver: 3,
            frames_delivered: 40,
            frames_recycled: 40,
            frames_discarded: 0,
        };

        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("camera_session_state 2"));
        assert!(output.contains("camera_session_commands_total 7"));
        assert!(output.contains("camera_session_pool_buffers_with_driver 3"));
    }

    #[test]
    fn test_counters_never_go_backwards() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&MetricsSnapshot {
            commands_executed: 5,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            commands_executed: 3,
            ..Default::default()
        });
        let output = registry.encode().unwrap();
        assert!(output.contains("camera_session_commands_total 5"));
    }

    #[test]
    fn test_snapshot_from_closed_session() {
        let snapshot = MetricsSnapshot::from_components(&SessionSnapshot::default());
        assert_eq!(snapshot.session_state, 0);
        assert_eq!(snapshot.open_camera, -1);
        assert_eq!(snapshot.pool_generation, 0);
    }
}
