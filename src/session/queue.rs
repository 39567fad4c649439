//! Ordered command queue shared by submitters and the worker.

use super::command::{Command, CommandKind};
use super::SessionError;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A submitted command with its submission sequence number.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub sequence: u64,
    pub command: Command,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Envelope>,
    next_sequence: u64,
    /// The worker has taken a command and not completed it yet.
    busy: bool,
    closed: bool,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        !self.busy && self.pending.is_empty()
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
    idle: Condvar,
}

/// Unbounded FIFO of commands.
///
/// Any number of threads may submit; one worker consumes. Submission never
/// blocks on the worker, and execution order is submission order.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    shared: Arc<Shared>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command and returns its sequence number.
    pub fn submit(&self, command: Command) -> Result<u64, SessionError> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(SessionError::QueueClosed);
        }
        let sequence = Self::push(&mut state, command);
        drop(state);
        self.shared.available.notify_one();
        Ok(sequence)
    }

    /// Appends several commands back to back.
    ///
    /// The batch lands contiguously: no other submitter can interleave a
    /// command between its elements.
    pub fn submit_batch(
        &self,
        commands: impl IntoIterator<Item = Command>,
    ) -> Result<Vec<u64>, SessionError> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(SessionError::QueueClosed);
        }
        let sequences: Vec<u64> = commands
            .into_iter()
            .map(|command| Self::push(&mut state, command))
            .collect();
        drop(state);
        self.shared.available.notify_one();
        Ok(sequences)
    }

    fn push(state: &mut QueueState, command: Command) -> u64 {
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        tracing::trace!(sequence, command = %command.kind(), "Command queued");
        state.pending.push_back(Envelope { sequence, command });
        sequence
    }

    /// Drops every pending command of `kind`. A command the worker already
    /// took is unaffected. Returns how many were removed.
    pub fn remove_pending(&self, kind: CommandKind) -> usize {
        let mut state = self.shared.state.lock();
        let before = state.pending.len();
        state.pending.retain(|queued| queued.command.kind() != kind);
        let removed = before - state.pending.len();
        if removed > 0 {
            tracing::debug!(command = %kind, removed, "Cancelled pending commands");
        }
        if state.is_idle() {
            self.shared.idle.notify_all();
        }
        removed
    }

    /// Commands waiting to run.
    pub fn pending_len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Blocks until a command is available and marks the worker busy.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub fn next(&self) -> Option<Envelope> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(envelope) = state.pending.pop_front() {
                state.busy = true;
                return Some(envelope);
            }
            if state.closed {
                return None;
            }
            self.shared.available.wait(&mut state);
        }
    }

    /// Marks the command returned by the last [`CommandQueue::next`] as done.
    pub fn complete(&self) {
        let mut state = self.shared.state.lock();
        state.busy = false;
        if state.is_idle() {
            self.shared.idle.notify_all();
        }
    }

    /// Waits until nothing is pending or running. Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.is_idle() {
            if self.shared.idle.wait_until(&mut state, deadline).timed_out() {
                return state.is_idle();
            }
        }
        true
    }

    /// Refuses further submissions. Commands already queued still run.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        state.closed = true;
        drop(state);
        self.shared.available.notify_all();
        self.shared.idle.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    fn drain(queue: &CommandQueue) -> Vec<Envelope> {
        queue.close();
        let mut taken = Vec::new();
        while let Some(envelope) = queue.next() {
            queue.complete();
            taken.push(envelope);
        }
        taken
    }

    #[test]
    fn test_fifo_order() {
        let queue = CommandQueue::new();
        queue.submit(Command::Open { camera_id: 0 }).unwrap();
        queue.submit(Command::StartPreview).unwrap();
        queue.submit(Command::Close).unwrap();

        let kinds: Vec<CommandKind> = drain(&queue).iter().map(|e| e.command.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Open,
                CommandKind::StartPreview,
                CommandKind::Close,
            ]
        );
    }

    #[test]
    fn test_remove_pending_only_touches_that_kind() {
        let queue = CommandQueue::new();
        queue.submit(Command::Open { camera_id: 0 }).unwrap();
        queue.submit(Command::StartPreview).unwrap();
        queue.submit(Command::Open { camera_id: 1 }).unwrap();

        assert_eq!(queue.remove_pending(CommandKind::Open), 2);
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(queue.remove_pending(CommandKind::Open), 0);
    }

    #[test]
    fn test_taken_command_cannot_be_cancelled() {
        let queue = CommandQueue::new();
        queue.submit(Command::Open { camera_id: 0 }).unwrap();
        let running = queue.next().unwrap();
        assert_eq!(queue.remove_pending(CommandKind::Open), 0);
        assert_eq!(running.command.kind(), CommandKind::Open);
    }

    #[test]
    fn test_closed_queue_drains_then_ends() {
        let queue = CommandQueue::new();
        queue.submit(Command::Close).unwrap();
        queue.close();
        let refused = queue.submit(Command::Close).unwrap_err();
        assert_eq!(refused, SessionError::QueueClosed);
        assert!(queue.next().is_some());
        queue.complete();
        assert!(queue.next().is_none());
    }

    #[test]
    fn test_wait_idle() {
        let queue = CommandQueue::new();
        assert!(queue.wait_idle(Duration::from_millis(1)));

        queue.submit(Command::Capture).unwrap();
        assert!(!queue.wait_idle(Duration::from_millis(10)));

        let worker = {
            let queue = queue.clone();
            thread::spawn(move || {
                while let Some(_envelope) = queue.next() {
                    queue.complete();
                }
            })
        };
        assert!(queue.wait_idle(Duration::from_secs(5)));
        queue.close();
        worker.join().unwrap();
    }

    #[test]
    fn test_batch_is_contiguous_under_contention() {
        let queue = CommandQueue::new();
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        queue.submit(Command::Capture).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                let batch = [
                    Command::StopPreview,
                    Command::Close,
                    Command::Open { camera_id: 1 },
                ];
                queue.submit_batch(batch).unwrap();
            });
        });

        let kinds: Vec<CommandKind> = drain(&queue).iter().map(|e| e.command.kind()).collect();
        let start = kinds
            .iter()
            .position(|k| *k == CommandKind::StopPreview)
            .unwrap();
        assert_eq!(
            &kinds[start..start + 3],
            &[
                CommandKind::StopPreview,
                CommandKind::Close,
                CommandKind::Open,
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_per_submitter_order_is_preserved(counts in prop::collection::vec(1u32..40, 1..5)) {
            let queue = CommandQueue::new();
            thread::scope(|scope| {
                for (submitter, &count) in counts.iter().enumerate() {
                    let queue = &queue;
                    scope.spawn(move || {
                        for n in 0..count {
                            // Encode submitter and position in the command itself.
                            let command = Command::SetPreviewSize {
                                short_side: submitter as u32,
                                long_side: n,
                            };
                            queue.submit(command).unwrap();
                        }
                    });
                }
            });

            let taken = drain(&queue);
            prop_assert_eq!(taken.len() as u32, counts.iter().sum::<u32>());

            let mut next_expected = vec![0u32; counts.len()];
            for (position, envelope) in taken.iter().enumerate() {
                prop_assert_eq!(envelope.sequence, position as u64);
                if let Command::SetPreviewSize { short_side, long_side } = envelope.command {
                    prop_assert_eq!(long_side, next_expected[short_side as usize]);
                    next_expected[short_side as usize] += 1;
                }
            }
        }
    }
}
