//! Preview frame buffer pool.
//!
//! Allocates a fixed set of same-sized buffers once per preview
//! configuration. The buffers then circulate between the driver and the
//! frame callback for as long as that configuration lives; nothing is
//! reallocated per frame.

use super::{FrameBuffer, PixelFormat};
use crate::device::Size;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Number of buffers allocated for each preview configuration.
pub const BUFFER_COUNT: usize = 3;

/// Lock-free accounting for one pool generation.
///
/// Updated from the worker when buffers are lent, and from the driver's
/// frame path when they are delivered and returned.
#[derive(Debug)]
pub struct PoolStats {
    generation: u64,
    allocated: usize,
    with_driver: AtomicUsize,
    peak_with_driver: AtomicUsize,
    delivered: AtomicU64,
    recycled: AtomicU64,
    discarded: AtomicU64,
    retired: AtomicBool,
}

impl PoolStats {
    fn new(generation: u64, allocated: usize) -> Self {
        Self {
            generation,
            allocated,
            with_driver: AtomicUsize::new(0),
            peak_with_driver: AtomicUsize::new(0),
            delivered: AtomicU64::new(0),
            recycled: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            retired: AtomicBool::new(false),
        }
    }

    fn add_with_driver(&self, count: usize) {
        let now = self.with_driver.fetch_add(count, Ordering::AcqRel) + count;
        self.peak_with_driver.fetch_max(now, Ordering::AcqRel);
    }

    /// A buffer was handed to the driver.
    pub fn record_lend(&self) {
        self.add_with_driver(1);
    }

    /// The driver filled a buffer and passed it to the frame callback.
    pub fn record_delivery(&self) {
        self.with_driver.fetch_sub(1, Ordering::AcqRel);
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// A delivered buffer went back to the driver.
    pub fn record_return(&self) {
        self.add_with_driver(1);
        self.recycled.fetch_add(1, Ordering::Relaxed);
    }

    /// A delivered buffer was dropped instead of returned.
    pub fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// A buffer from a replaced configuration reached the frame callback
    /// and was dropped there.
    ///
    /// Buffers already written off by [`PoolStats::retire`] are not
    /// counted again.
    pub fn record_stale_delivery(&self) {
        if self.is_retired() {
            return;
        }
        self.record_delivery();
        self.record_discard();
    }

    /// Writes off every buffer still queued with the driver.
    ///
    /// Called once the driver has let go of this generation, either on
    /// release or after a stream change. Returns the number written off.
    pub fn retire(&self) -> usize {
        if self.retired.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let outstanding = self.with_driver.swap(0, Ordering::AcqRel);
        self.discarded.fetch_add(outstanding as u64, Ordering::Relaxed);
        outstanding
    }

    /// Whether this generation has been written off.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Buffers created for this generation.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Buffers currently queued with the driver.
    pub fn with_driver(&self) -> usize {
        self.with_driver.load(Ordering::Acquire)
    }

    /// Highest number of buffers ever queued with the driver at once.
    pub fn peak_with_driver(&self) -> usize {
        self.peak_with_driver.load(Ordering::Acquire)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn recycled(&self) -> u64 {
        self.recycled.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

/// Owns the buffers of one preview configuration until they are lent out.
pub struct BufferPool {
    frame_size: Size,
    format: PixelFormat,
    buffer_len: usize,
    idle: Vec<FrameBuffer>,
    stats: Arc<PoolStats>,
}

impl BufferPool {
    /// Allocates [`BUFFER_COUNT`] buffers sized for `frame_size` in `format`.
    pub fn allocate(frame_size: Size, format: PixelFormat, generation: u64) -> Self {
        let buffer_len = format.frame_len(frame_size.width(), frame_size.height());
        let stats = Arc::new(PoolStats::new(generation, BUFFER_COUNT));
        let idle = (0..BUFFER_COUNT)
            .map(|slot| FrameBuffer::new(slot, generation, buffer_len, Arc::clone(&stats)))
            .collect();

        tracing::debug!(
            generation,
            size = %frame_size,
            format = %format,
            buffer_len,
            count = BUFFER_COUNT,
            "Allocated preview buffers"
        );

        Self {
            frame_size,
            format,
            buffer_len,
            idle,
            stats,
        }
    }

    /// Hands every idle buffer over for queueing with the driver.
    pub fn lend_all(&mut self) -> Vec<FrameBuffer> {
        let lent: Vec<FrameBuffer> = self.idle.drain(..).collect();
        for _ in &lent {
            self.stats.record_lend();
        }
        lent
    }

    pub fn frame_size(&self) -> Size {
        self.frame_size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Size in bytes of every buffer in this pool.
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn generation(&self) -> u64 {
        self.stats.generation()
    }

    /// Buffers not yet lent out.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }

    /// Retires the pool once the driver no longer holds its buffers.
    pub fn retire(self) -> usize {
        let outstanding = self.stats.retire();
        tracing::debug!(
            generation = self.stats.generation(),
            outstanding,
            "Retired preview buffers"
        );
        outstanding
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("frame_size", &self.frame_size)
            .field("format", &self.format)
            .field("buffer_len", &self.buffer_len)
            .field("idle", &self.idle.len())
            .field("generation", &self.stats.generation())
            .finish()
    }
}
