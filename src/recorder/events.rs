use crossbeam_channel::{Receiver, Sender};
use std::sync::Mutex;

use super::log::LogEntry;
use super::transcode::JobId;
use crate::utils::sync::lock;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecorderEvent {
    RecordingStarted,
    /// The session is over and every transcode job it left behind has drained.
    RecordingStopped,
    /// A kept clip was written to the recording log.
    LogUpdated(LogEntry),
    TranscodeFinished { job: JobId, success: bool },
}

/// Fan-out of recorder events to any number of subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<RecorderEvent>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> Receiver<RecorderEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Deliver to every live subscriber; dropped receivers are pruned.
    pub fn publish(&self, event: RecorderEvent) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }
}
