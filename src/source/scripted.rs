use super::{PoseSource, SourceStats};
use crate::error::SourceError;
use crate::pose::{Pose, PoseFrame};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::SystemTime;

/// In-memory source that replays a fixed list of frames
pub struct ScriptedSource {
    frames: VecDeque<Vec<Pose>>,
    next_id: u64,
    stats: SourceStats,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = Vec<Pose>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            next_id: 1,
            stats: SourceStats::default(),
        }
    }

    /// One single-person frame per pose
    pub fn single_person(poses: impl IntoIterator<Item = Pose>) -> Self {
        Self::new(poses.into_iter().map(|pose| vec![pose]))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl PoseSource for ScriptedSource {
    async fn next_frame(&mut self) -> Result<Option<PoseFrame>, SourceError> {
        let Some(poses) = self.frames.pop_front() else {
            return Ok(None);
        };

        let frame = PoseFrame::new(self.next_id, SystemTime::now(), poses);
        self.next_id += 1;
        self.stats.frames_read += 1;
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn stats(&self) -> SourceStats {
        self.stats
    }
}
