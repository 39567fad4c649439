//! Reusable byte block lent to the device driver for preview frames.

use super::pool::PoolStats;
use std::sync::Arc;

/// A fixed-size preview frame buffer.
///
/// Buffers are deliberately not `Clone`: a buffer moves from the pool to
/// the driver, from the driver into the frame callback and back again, so
/// at most one party can reference it at any time.
pub struct FrameBuffer {
    /// Slot index within its pool.
    slot: usize,
    /// Pool generation this buffer belongs to.
    generation: u64,
    /// Driver frame counter of the last fill.
    sequence: u64,
    bytes: Vec<u8>,
    stats: Arc<PoolStats>,
}

impl FrameBuffer {
    pub(crate) fn new(slot: usize, generation: u64, len: usize, stats: Arc<PoolStats>) -> Self {
        Self {
            slot,
            generation,
            sequence: 0,
            bytes: vec![0u8; len],
            stats,
        }
    }

    /// Returns the frame bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable access for the driver while filling a frame.
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Stamps the buffer with the driver's frame counter.
    pub fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Accounting shared with the pool that allocated this buffer.
    pub fn stats(&self) -> &Arc<PoolStats> {
        &self.stats
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .field("sequence", &self.sequence)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
