//! Notifications emitted by the session.
//!
//! Every subscriber gets its own unbounded channel. Events are sent in the
//! order they are emitted, and each emitter (worker, frame path, capture
//! sequence) emits in the order the device produced them.

use super::command::CommandKind;
use super::SessionError;
use crate::device::{Facing, Size};
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

/// Something that happened in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    DeviceOpened {
        camera_id: u32,
        facing: Facing,
        /// Compensation applied to the preview, in degrees.
        display_orientation: u16,
    },
    DeviceClosed {
        camera_id: u32,
    },
    PreviewSizeSelected(Size),
    CaptureSizeSelected(Size),
    SurfaceBound {
        surface_id: u64,
    },
    SurfaceUnbound,
    PreviewStarted,
    PreviewStopped,
    ShutterFired,
    RawAvailable(Vec<u8>),
    PostviewAvailable(Vec<u8>),
    ImageAvailable(Vec<u8>),
    /// A preview frame was inspected and its buffer returned. Only emitted
    /// when frame events are enabled.
    FrameDelivered {
        sequence: u64,
        len: usize,
    },
    /// The worker finished a command, successfully or not.
    CommandCompleted {
        sequence: u64,
        kind: CommandKind,
    },
    Error {
        kind: CommandKind,
        error: SessionError,
    },
}

/// A timestamped event.
#[derive(Debug, Clone)]
pub struct Notification {
    pub at: DateTime<Utc>,
    pub event: SessionEvent,
}

/// Fan-out of session events to any number of subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<Notification>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber. Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Sends `event` to every live subscriber.
    pub fn emit(&self, event: SessionEvent) {
        let notification = Notification {
            at: Utc::now(),
            event,
        };
        let mut live = self.subscribers.lock();
        live.retain(|tx| tx.send(notification.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_every_subscriber_in_order() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.emit(SessionEvent::ShutterFired);
        bus.emit(SessionEvent::RawAvailable(vec![1]));

        for rx in [&first, &second] {
            let events: Vec<SessionEvent> = rx.try_iter().map(|n| n.event).collect();
            assert_eq!(
                events,
                vec![
                    SessionEvent::ShutterFired,
                    SessionEvent::RawAvailable(vec![1]),
                ]
            );
        }
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.emit(SessionEvent::PreviewStarted);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
