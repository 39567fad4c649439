//! Inputs supplied by the host application.

use crate::buffers::FrameBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of the host's camera permission check.
///
/// The host updates it when the user answers a permission prompt; the
/// worker reads it whenever it opens a camera.
#[derive(Debug, Clone)]
pub struct Permission {
    granted: Arc<AtomicBool>,
}

impl Permission {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(granted)),
        }
    }

    pub fn granted() -> Self {
        Self::new(true)
    }

    pub fn denied() -> Self {
        Self::new(false)
    }

    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::Acquire)
    }

    pub fn set(&self, granted: bool) {
        self.granted.store(granted, Ordering::Release);
    }
}

/// Inspects preview frames before their buffers go back to the driver.
///
/// Runs on the driver's delivery context and must not block: the buffer is
/// returned as soon as this returns.
pub trait FrameObserver: Send + Sync {
    fn on_frame(&self, frame: &FrameBuffer);
}

impl<F> FrameObserver for F
where
    F: Fn(&FrameBuffer) + Send + Sync,
{
    fn on_frame(&self, frame: &FrameBuffer) {
        self(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_is_shared() {
        let permission = Permission::denied();
        let host = permission.clone();
        assert!(!permission.is_granted());
        host.set(true);
        assert!(permission.is_granted());
    }
}
