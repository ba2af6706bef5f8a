//! Batch counters and progress notifications
//!
//! `BatchStats` holds the per-run counters behind a single lock so every
//! snapshot satisfies `succeeded + failed == processed`. Observers receive
//! typed `ProgressEvent`s through a `ProgressSink`; nothing needs to poll.
//! Deliveries are ordered by a second lock, never the counters lock, so a
//! sink may read the counters from inside its callback.

use crate::batch::Phase;
use crate::compile::CompileResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Point-in-time copy of the batch counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSnapshot {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub current_file: Option<PathBuf>,
}

impl BatchSnapshot {
    /// Completion percentage, truncated (0 when there is nothing to do)
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            (self.processed * 100 / self.total) as u8
        }
    }

    /// Completion ratio in `0.0..=1.0`
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Process-wide counters of one batch run
#[derive(Debug, Default)]
pub struct BatchStats {
    inner: Mutex<BatchSnapshot>,
    notify_lock: Mutex<()>,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BatchSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delivery(&self) -> MutexGuard<'_, ()> {
        self.notify_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Zero every counter
    pub fn reset(&self) {
        *self.lock() = BatchSnapshot::default();
    }

    /// Fix the number of files to compile once discovery is over
    pub fn set_total(&self, total: usize) {
        let mut counters = self.lock();
        debug_assert_eq!(counters.processed, 0, "total changed mid-run");
        counters.total = total;
    }

    pub fn set_current_file(&self, path: &Path) -> BatchSnapshot {
        let mut counters = self.lock();
        counters.current_file = Some(path.to_path_buf());
        counters.clone()
    }

    /// Count one completed file and hand the new snapshot to `notify`
    ///
    /// `notify` runs under the delivery lock only, so observers see
    /// snapshots in the order the counters changed and may still call the
    /// accessors.
    pub fn record<F>(&self, success: bool, notify: F) -> BatchSnapshot
    where
        F: FnOnce(&BatchSnapshot),
    {
        let _delivery = self.delivery();
        let snapshot = {
            let mut counters = self.lock();
            debug_assert!(counters.processed < counters.total, "processed exceeds total");
            counters.processed += 1;
            if success {
                counters.succeeded += 1;
            } else {
                counters.failed += 1;
            }
            counters.clone()
        };
        notify(&snapshot);
        snapshot
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        self.lock().clone()
    }

    /// Inspect a snapshot while no `record` can slip in between
    ///
    /// Holds the delivery lock, not the counters lock.
    pub fn observe<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&BatchSnapshot) -> R,
    {
        let _delivery = self.delivery();
        let snapshot = self.snapshot();
        f(&snapshot)
    }

    pub fn total(&self) -> usize {
        self.lock().total
    }

    pub fn processed(&self) -> usize {
        self.lock().processed
    }

    pub fn succeeded(&self) -> usize {
        self.lock().succeeded
    }

    pub fn failed(&self) -> usize {
        self.lock().failed
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.lock().current_file.clone()
    }

    pub fn summary(&self) -> String {
        let counters = self.lock();
        format!(
            "Total: {}, Processed: {}, Succeeded: {}, Failed: {}",
            counters.total, counters.processed, counters.succeeded, counters.failed
        )
    }
}

/// Progress notification emitted by the orchestrator
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The orchestrator entered a new phase
    Phase(Phase),
    /// Running count of designs found so far
    Discovered { count: usize },
    /// Discovery is over and the total is fixed
    Started { total: usize },
    /// A file is about to be compiled
    FileStarted { path: PathBuf, snapshot: BatchSnapshot },
    /// A file finished (successfully or not)
    FileFinished {
        result: CompileResult,
        snapshot: BatchSnapshot,
    },
    /// Periodic refresh between file notifications
    Tick(BatchSnapshot),
    /// The run is over
    Complete(BatchSnapshot),
}

/// Consumer of progress notifications
///
/// Implementations should be cheap: `FileFinished` and `Tick` deliveries
/// are serialized, so a slow sink holds up the workers. Reading
/// `BatchStats` from inside `notify` is fine.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn notify(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Drops every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Forwards notifications to another thread
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn notify(&self, event: ProgressEvent) {
        // The receiver going away only means nobody is watching anymore
        let _ = self.tx.send(event);
    }
}

/// Reports progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn notify(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase(phase) => debug!(?phase, "Phase changed"),
            ProgressEvent::Discovered { count } => debug!(count, "Discovering designs"),
            ProgressEvent::Started { total } => info!(total, "Compiling reports..."),
            ProgressEvent::FileStarted { path, .. } => {
                debug!(file = %path.display(), "Compiling");
            }
            ProgressEvent::FileFinished { result, snapshot } => match result {
                CompileResult::Success { source, .. } => info!(
                    file = %source.display(),
                    progress = %format!("{}/{}", snapshot.processed, snapshot.total),
                    percent = snapshot.percent(),
                    "Compiled"
                ),
                CompileResult::Failure { source, message } => warn!(
                    file = %source.display(),
                    progress = %format!("{}/{}", snapshot.processed, snapshot.total),
                    percent = snapshot.percent(),
                    error = %message,
                    "Compile failed"
                ),
            },
            ProgressEvent::Tick(_) => {}
            ProgressEvent::Complete(snapshot) => info!(
                total = snapshot.total,
                succeeded = snapshot.succeeded,
                failed = snapshot.failed,
                "All reports processed"
            ),
        }
    }
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Emit `Tick` events until every file is processed or `stop` is raised
///
/// Sleeps `interval` between checks; meant to run on its own thread for
/// the duration of the compile stage.
pub fn run_ticker(stats: &BatchStats, sink: &dyn ProgressSink, interval: Duration, stop: &AtomicBool) {
    loop {
        let done = stats.observe(|snapshot| {
            if stop.load(Ordering::Relaxed) || snapshot.is_complete() {
                return true;
            }
            sink.notify(ProgressEvent::Tick(snapshot.clone()));
            false
        });
        if done {
            break;
        }
        std::thread::sleep(interval);
    }
}
