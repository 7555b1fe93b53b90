use crate::pose::PoseFrame;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Notify, RwLock};
use tracing::trace;

/// Single-slot mailbox holding the most recent pose frame.
///
/// The capture task overwrites the slot as frames arrive; the analysis task
/// reads whatever is current, so a slow reader sees the newest frame rather
/// than a backlog.
pub struct LatestPose {
    slot: RwLock<Option<PoseFrame>>,
    updated: Notify,
    consumed: Notify,
    closed: AtomicBool,
    last_taken_id: AtomicU64,
    stats: LatestPoseCounters,
}

#[derive(Debug, Default)]
struct LatestPoseCounters {
    published: AtomicU64,
    taken: AtomicU64,
    overwritten: AtomicU64,
}

/// Snapshot of slot statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatestPoseStats {
    pub published: u64,
    pub taken: u64,
    /// Frames replaced before anyone read them
    pub overwritten: u64,
}

impl Default for LatestPose {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestPose {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            updated: Notify::new(),
            consumed: Notify::new(),
            closed: AtomicBool::new(false),
            last_taken_id: AtomicU64::new(0),
            stats: LatestPoseCounters::default(),
        }
    }

    /// Replace the current frame and wake the reader
    pub async fn publish(&self, frame: PoseFrame) {
        {
            let mut slot = self.slot.write().await;
            if let Some(previous) = slot.as_ref() {
                if previous.id > self.last_taken_id.load(Ordering::SeqCst) {
                    self.stats.overwritten.fetch_add(1, Ordering::Relaxed);
                    trace!("Frame {} replaced before analysis", previous.id);
                }
            }
            *slot = Some(frame);
        }

        self.stats.published.fetch_add(1, Ordering::Relaxed);
        self.updated.notify_one();
    }

    /// The current frame, if it is newer than `after_id`. Marks it as taken.
    pub async fn take_newer(&self, after_id: u64) -> Option<PoseFrame> {
        let frame = {
            let slot = self.slot.read().await;
            slot.as_ref().filter(|frame| frame.id > after_id).cloned()
        }?;

        self.last_taken_id.fetch_max(frame.id, Ordering::SeqCst);
        self.stats.taken.fetch_add(1, Ordering::Relaxed);
        self.consumed.notify_one();
        Some(frame)
    }

    /// The current frame without marking it taken
    pub async fn peek(&self) -> Option<PoseFrame> {
        self.slot.read().await.clone()
    }

    /// Wait until a new frame is published or the slot is closed
    pub async fn wait_for_update(&self) {
        if self.is_closed() {
            return;
        }
        self.updated.notified().await;
    }

    /// Wait until the reader has taken frame `id` (or anything newer)
    pub async fn wait_until_taken(&self, id: u64) {
        while self.last_taken_id.load(Ordering::SeqCst) < id {
            self.consumed.notified().await;
        }
    }

    /// Mark the stream finished. Frames published before this stay readable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.updated.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn last_taken_id(&self) -> u64 {
        self.last_taken_id.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> LatestPoseStats {
        LatestPoseStats {
            published: self.stats.published.load(Ordering::Relaxed),
            taken: self.stats.taken.load(Ordering::Relaxed),
            overwritten: self.stats.overwritten.load(Ordering::Relaxed),
        }
    }
}
