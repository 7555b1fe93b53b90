use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Why a session stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfStream,
    Cancelled,
    Signal(String),
    SourceFailure(String),
}

/// Totals reported when a session finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub reps: u32,
    pub frames_read: u64,
    pub frames_analyzed: u64,
    pub frames_without_pose: u64,
    /// Frames replaced in the latest-pose slot before analysis
    pub frames_skipped: u64,
    pub malformed_lines: u64,
    pub announcements: u64,
    pub stop_reason: StopReason,
}

impl SessionSummary {
    pub fn duration_secs(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Write the summary as pretty-printed JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        info!("Session summary written to {}", path.as_ref().display());
        Ok(())
    }

    pub fn log(&self) {
        info!("Session {} finished: {:?}", self.session_id, self.stop_reason);
        info!("  Squats completed: {}", self.reps);
        info!(
            "  Frames: {} read, {} analyzed, {} without pose, {} skipped",
            self.frames_read, self.frames_analyzed, self.frames_without_pose, self.frames_skipped
        );
        if self.malformed_lines > 0 {
            info!("  Malformed input lines: {}", self.malformed_lines);
        }
        info!("  Duration: {:.1}s", self.duration_secs());
    }
}
