use super::{PoseSource, SourceStats};
use crate::error::SourceError;
use crate::pose::{Pose, PoseFrame};

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::{debug, trace, warn};

/// Accepted shapes of one input line
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireFrame {
    Framed {
        poses: Vec<Pose>,
        #[serde(default)]
        timestamp_ms: Option<u64>,
    },
    Bare(Vec<Pose>),
}

/// Reads pose frames encoded as one JSON document per line.
///
/// A line is either `{"poses": [...], "timestamp_ms": 123}` or a bare array of
/// poses, each pose being `{"keypoints": [{"x": .., "y": .., "score": ..}, ..]}`.
/// Blank lines are ignored. Lines that fail to parse are logged, counted and
/// skipped.
pub struct JsonLinesSource<R> {
    lines: Lines<BufReader<R>>,
    name: String,
    line_number: u64,
    next_id: u64,
    stats: SourceStats,
}

impl<R: AsyncRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            name: name.into(),
            line_number: 0,
            next_id: 1,
            stats: SourceStats::default(),
        }
    }

    fn parse_line(&self, line: &str) -> Result<PoseFrame, SourceError> {
        let wire: WireFrame =
            serde_json::from_str(line).map_err(|e| SourceError::Malformed {
                line: self.line_number,
                details: e.to_string(),
            })?;

        let (poses, timestamp) = match wire {
            WireFrame::Framed {
                poses,
                timestamp_ms: Some(ms),
            } => (poses, UNIX_EPOCH + Duration::from_millis(ms)),
            WireFrame::Framed { poses, .. } | WireFrame::Bare(poses) => {
                (poses, SystemTime::now())
            }
        };

        Ok(PoseFrame::new(self.next_id, timestamp, poses))
    }
}

impl JsonLinesSource<tokio::fs::File> {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| SourceError::Open {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self::new(file, path.display().to_string()))
    }
}

impl JsonLinesSource<tokio::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin(), "stdin")
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> PoseSource for JsonLinesSource<R> {
    async fn next_frame(&mut self) -> Result<Option<PoseFrame>, SourceError> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match self.parse_line(line) {
                Ok(frame) => {
                    trace!(
                        "Read frame {} with {} poses from {}",
                        frame.id,
                        frame.poses.len(),
                        self.name
                    );
                    self.next_id += 1;
                    self.stats.frames_read += 1;
                    return Ok(Some(frame));
                }
                Err(e) => {
                    warn!("Skipping input from {}: {}", self.name, e);
                    self.stats.malformed_lines += 1;
                }
            }
        }

        debug!(
            "Reached end of {} after {} lines",
            self.name, self.line_number
        );
        Ok(None)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&self) -> SourceStats {
        self.stats
    }
}
