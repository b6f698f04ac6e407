use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use tracing::{error, info};

const MAX_QUEUED_ERRORS: usize = 16;

/// Cumulative tally for one scan run, pushed after every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
    pub bunnies_found: usize,
}

impl ScanProgress {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f64 * 100.0 / self.total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ScanEvent {
    ScanProgress(ScanProgress),
    ScanError { message: String },
}

/// Receiver of progress notifications. Calls never block the scan for long
/// and carry no acknowledgement.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: ScanProgress);
    fn on_error(&self, _message: &str) {}
}

pub struct SilentSink;

impl ProgressSink for SilentSink {
    fn on_progress(&self, _progress: ScanProgress) {}
}

pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_progress(&self, p: ScanProgress) {
        info!(
            "progress {}/{} ({:.1}%) bunnies={}",
            p.processed,
            p.total,
            p.percentage(),
            p.bunnies_found
        );
    }

    fn on_error(&self, message: &str) {
        error!("scan error: {message}");
    }
}

/// Records every event in order.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ScanEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<ScanEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn progress(&self) -> Vec<ScanProgress> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ScanEvent::ScanProgress(p) => Some(p),
                ScanEvent::ScanError { .. } => None,
            })
            .collect()
    }

    fn push(&self, ev: ScanEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(ev);
        }
    }
}

impl ProgressSink for CollectingSink {
    fn on_progress(&self, progress: ScanProgress) {
        self.push(ScanEvent::ScanProgress(progress));
    }

    fn on_error(&self, message: &str) {
        self.push(ScanEvent::ScanError {
            message: message.to_string(),
        });
    }
}

/// Bounded hand-off between the scan and a slower consumer.
///
/// Events come out in the order they were sent. Consecutive progress
/// snapshots coalesce to the latest one, so a consumer that falls behind only
/// sees the newest tally. Error events queue up to a fixed bound, dropping the
/// oldest.
#[derive(Default)]
pub struct ProgressMailbox {
    state: Mutex<MailboxState>,
    ready: Condvar,
}

#[derive(Default)]
struct MailboxState {
    queue: VecDeque<ScanEvent>,
    errors: usize,
    closed: bool,
}

impl MailboxState {
    fn pop(&mut self) -> Option<ScanEvent> {
        let ev = self.queue.pop_front()?;
        if matches!(ev, ScanEvent::ScanError { .. }) {
            self.errors -= 1;
        }
        Some(ev)
    }
}

impl ProgressMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until an event is available. Returns `None` once the mailbox is
    /// closed and drained.
    pub fn recv(&self) -> Option<ScanEvent> {
        let mut st = self.state.lock().ok()?;
        loop {
            if let Some(ev) = st.pop() {
                return Some(ev);
            }
            if st.closed {
                return None;
            }
            st = self.ready.wait(st).ok()?;
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&self) -> Option<ScanEvent> {
        self.state.lock().ok()?.pop()
    }

    pub fn close(&self) {
        if let Ok(mut st) = self.state.lock() {
            st.closed = true;
        }
        self.ready.notify_all();
    }
}

impl ProgressSink for ProgressMailbox {
    fn on_progress(&self, progress: ScanProgress) {
        if let Ok(mut st) = self.state.lock() {
            match st.queue.back_mut() {
                Some(ScanEvent::ScanProgress(last)) => *last = progress,
                _ => st.queue.push_back(ScanEvent::ScanProgress(progress)),
            }
        }
        self.ready.notify_one();
    }

    fn on_error(&self, message: &str) {
        if let Ok(mut st) = self.state.lock() {
            if st.errors == MAX_QUEUED_ERRORS {
                let oldest = st
                    .queue
                    .iter()
                    .position(|ev| matches!(ev, ScanEvent::ScanError { .. }));
                if let Some(i) = oldest {
                    st.queue.remove(i);
                    st.errors -= 1;
                }
            }
            st.queue.push_back(ScanEvent::ScanError {
                message: message.to_string(),
            });
            st.errors += 1;
        }
        self.ready.notify_one();
    }
}
