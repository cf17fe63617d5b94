use super::ports::{CompletionSink, Job};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// Sending half of the host's main queue. Cloned into background work.
#[derive(Clone)]
pub struct MainQueueSender {
    tx: Sender<Job>,
}

/// Receiving half, owned by the thread that should run callbacks.
pub struct MainQueue {
    rx: Receiver<Job>,
}

pub fn main_queue() -> (MainQueueSender, MainQueue) {
    let (tx, rx) = mpsc::channel();
    (MainQueueSender { tx }, MainQueue { rx })
}

impl MainQueueSender {
    pub fn send(&self, job: Job) -> Result<(), mpsc::SendError<Job>> {
        self.tx.send(job)
    }
}

impl CompletionSink for MainQueueSender {
    fn post(&self, job: Job) {
        if self.send(job).is_err() {
            tracing::debug!("main queue closed, dropping job");
        }
    }
}

impl MainQueue {
    /// Runs every job queued so far and returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Blocks up to `timeout` for work, then runs whatever is queued.
    /// Returns `false` once every sender is gone and the queue is empty.
    pub fn run_for(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => {
                job();
                self.run_pending();
                true
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Runs jobs until `done` holds or `timeout` elapses. Returns `done()`.
    pub fn run_until(&mut self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while !done() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.run_for(remaining.min(Duration::from_millis(50))) {
                break;
            }
        }
        done()
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/services/bus.rs"]
mod tests;
