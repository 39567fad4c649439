//! Preview frame buffers.
//!
//! Frames are streamed into a small set of pre-allocated buffers that the
//! device driver fills and the session recycles after every frame.

mod format;
mod frame;
mod pool;

pub use format::PixelFormat;
pub use frame::FrameBuffer;
pub use pool::{BufferPool, PoolStats, BUFFER_COUNT};
