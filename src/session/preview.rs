//! Device callbacks installed by the session.
//!
//! Both run on the driver's delivery context. They only touch the event
//! bus, the optional frame observer and the buffer they were handed.

use super::events::{EventBus, SessionEvent};
use super::hooks::FrameObserver;
use crate::buffers::FrameBuffer;
use crate::device::{BufferQueue, PictureCallback, PreviewCallback};
use std::sync::Arc;

/// Hands each preview frame to the observer, then gives the buffer straight
/// back to the driver.
pub(crate) struct RecyclingCallback {
    /// Pool generation that was live when preview started. `None` means no
    /// pool was set up and every delivered buffer is stale.
    generation: Option<u64>,
    events: EventBus,
    observer: Option<Arc<dyn FrameObserver>>,
    emit_frames: bool,
}

impl RecyclingCallback {
    pub(crate) fn new(
        generation: Option<u64>,
        events: EventBus,
        observer: Option<Arc<dyn FrameObserver>>,
        emit_frames: bool,
    ) -> Self {
        Self {
            generation,
            events,
            observer,
            emit_frames,
        }
    }
}

impl PreviewCallback for RecyclingCallback {
    fn on_preview_frame(&mut self, frame: FrameBuffer, queue: &mut dyn BufferQueue) {
        let stats = Arc::clone(frame.stats());
        if Some(frame.generation()) != self.generation {
            stats.record_stale_delivery();
            tracing::debug!(
                slot = frame.slot(),
                generation = frame.generation(),
                "Discarding buffer from a previous preview configuration"
            );
            return;
        }

        stats.record_delivery();
        if let Some(observer) = &self.observer {
            observer.on_frame(&frame);
        }

        tracing::trace!(
            sequence = frame.sequence(),
            slot = frame.slot(),
            "Preview frame"
        );
        if self.emit_frames {
            self.events.emit(SessionEvent::FrameDelivered {
                sequence: frame.sequence(),
                len: frame.len(),
            });
        }

        stats.record_return();
        queue.add_callback_buffer(frame);
    }
}

/// Forwards the still-capture stages to subscribers.
pub(crate) struct CaptureRelay {
    events: EventBus,
}

impl CaptureRelay {
    pub(crate) fn new(events: EventBus) -> Self {
        Self { events }
    }
}

impl PictureCallback for CaptureRelay {
    fn on_shutter(&mut self) {
        self.events.emit(SessionEvent::ShutterFired);
    }

    fn on_raw(&mut self, data: Vec<u8>) {
        self.events.emit(SessionEvent::RawAvailable(data));
    }

    fn on_postview(&mut self, data: Vec<u8>) {
        self.events.emit(SessionEvent::PostviewAvailable(data));
    }

    fn on_image(&mut self, data: Vec<u8>) {
        tracing::debug!(bytes = data.len(), "Picture ready");
        self.events.emit(SessionEvent::ImageAvailable(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::{BufferPool, PixelFormat};
    use crate::device::Size;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool(generation: u64) -> BufferPool {
        BufferPool::allocate(Size::new(320, 240).unwrap(), PixelFormat::Nv21, generation)
    }

    #[test]
    fn test_current_buffer_is_observed_and_requeued() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let observer: Arc<dyn FrameObserver> = Arc::new(move |_: &FrameBuffer| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut pool = pool(4);
        let stats = pool.stats();
        let events = EventBus::new();
        let rx = events.subscribe();
        let mut callback = RecyclingCallback::new(Some(4), events, Some(observer), true);

        let mut queue: VecDeque<FrameBuffer> = VecDeque::new();
        let mut lent = pool.lend_all();
        let frame = lent.pop().unwrap();
        callback.on_preview_frame(frame, &mut queue);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(stats.recycled(), 1);
        assert_eq!(stats.with_driver(), 3);
        assert!(matches!(
            rx.try_recv().unwrap().event,
            SessionEvent::FrameDelivered { .. }
        ));
    }

    #[test]
    fn test_stale_buffer_is_dropped() {
        let mut old = pool(1);
        let stats = old.stats();
        let mut callback = RecyclingCallback::new(Some(2), EventBus::new(), None, false);

        let mut queue: VecDeque<FrameBuffer> = VecDeque::new();
        let frame = old.lend_all().pop().unwrap();
        callback.on_preview_frame(frame, &mut queue);

        assert!(queue.is_empty());
        assert_eq!(stats.discarded(), 1);
        assert_eq!(stats.with_driver(), 2);
    }

    #[test]
    fn test_capture_relay_preserves_stage_order() {
        let events = EventBus::new();
        let rx = events.subscribe();
        let mut relay = CaptureRelay::new(events);

        relay.on_shutter();
        relay.on_raw(vec![1]);
        relay.on_postview(vec![2]);
        relay.on_image(vec![3]);

        let stages: Vec<SessionEvent> = rx.try_iter().map(|n| n.event).collect();
        assert_eq!(
            stages,
            vec![
                SessionEvent::ShutterFired,
                SessionEvent::RawAvailable(vec![1]),
                SessionEvent::PostviewAvailable(vec![2]),
                SessionEvent::ImageAvailable(vec![3]),
            ]
        );
    }
}
