mod jsonl;
mod latest;
mod scripted;

pub use jsonl::JsonLinesSource;
pub use latest::{LatestPose, LatestPoseStats};
pub use scripted::ScriptedSource;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::pose::PoseFrame;
use async_trait::async_trait;
use tracing::info;

/// Counters kept by every pose source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_read: u64,
    pub malformed_lines: u64,
}

/// A stream of pose estimates, one frame at a time
#[async_trait]
pub trait PoseSource: Send {
    /// Next frame, or `None` once the stream is exhausted
    async fn next_frame(&mut self) -> Result<Option<PoseFrame>, SourceError>;

    /// Get the name of this source for logging
    fn name(&self) -> &str;

    fn stats(&self) -> SourceStats;
}

/// Open the source described by the configuration ("-" reads stdin)
pub async fn open_source(config: &SourceConfig) -> Result<Box<dyn PoseSource>, SourceError> {
    if config.input == "-" {
        info!("Reading pose frames from stdin");
        Ok(Box::new(JsonLinesSource::stdin()))
    } else {
        info!("Reading pose frames from {}", config.input);
        Ok(Box::new(JsonLinesSource::open(&config.input).await?))
    }
}
