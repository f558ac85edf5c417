//! Tick task queue.
//!
//! Session state is only touched on the tick thread. Download workers and the
//! natural-stop poll push [`Task`]s here; the playback context drains them at the
//! start of the following tick.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::engine::{PlaybackState, SoundId};
use crate::handle::Continuation;
use crate::progress::ProgressEvent;
use crate::world::PlaybackKey;

/// Deferred work for the tick thread.
#[derive(Debug)]
pub enum Task {
    /// A download progress callback for `sound`.
    Progress { sound: SoundId, event: ProgressEvent },
    /// `sound` ended on its own at `key`; run its continuation.
    Resume {
        key: PlaybackKey,
        sound: SoundId,
        continuation: Continuation,
        outcome: PlaybackState,
    },
}

/// Cloneable producer side of the queue, safe to move to worker threads.
#[derive(Debug, Clone)]
pub struct TaskSender(Sender<Task>);

impl TaskSender {
    /// Queues a task. Tasks sent after the queue is gone are dropped.
    pub fn send(&self, task: Task) {
        if self.0.send(task).is_err() {
            tracing::debug!("Task queue closed, dropping task");
        }
    }
}

/// FIFO of tasks drained once per tick.
pub struct TaskQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> TaskSender {
        TaskSender(self.tx.clone())
    }

    pub fn push(&self, task: Task) {
        // The receiver lives in self, so this cannot fail.
        let _ = self.tx.send(task);
    }

    /// Takes every task queued so far. Tasks queued while the batch runs wait for the next drain.
    pub fn drain(&self) -> Vec<Task> {
        self.rx.try_iter().collect()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let queue = TaskQueue::new();
        let a = SoundId::next();
        let b = SoundId::next();
        queue.push(Task::Progress { sound: a, event: ProgressEvent::StartLoading });
        queue.push(Task::Progress { sound: b, event: ProgressEvent::Success });

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], Task::Progress { sound, .. } if sound == a));
        assert!(matches!(drained[1], Task::Progress { sound, .. } if sound == b));
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_sender_from_other_thread() {
        let queue = TaskQueue::new();
        let sender = queue.sender();
        let sound = SoundId::next();

        std::thread::spawn(move || {
            sender.send(Task::Progress { sound, event: ProgressEvent::Percentage(50) });
        })
        .join()
        .unwrap();

        let drained = queue.drain();
        assert!(matches!(
            drained.as_slice(),
            [Task::Progress { event: ProgressEvent::Percentage(50), .. }]
        ));
    }

    #[test]
    fn test_send_after_queue_dropped() {
        let queue = TaskQueue::new();
        let sender = queue.sender();
        drop(queue);

        // Must not panic
        sender.send(Task::Progress { sound: SoundId::next(), event: ProgressEvent::Failure });
    }
}
