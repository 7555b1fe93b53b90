use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::source::{LatestPose, PoseSource, SourceStats};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// What the capture task reports back when it stops
pub(super) struct CaptureOutcome {
    pub stats: SourceStats,
    pub error: Option<SourceError>,
}

/// Moves frames from the pose source into the latest-pose slot
pub(super) struct CaptureTask {
    source: Box<dyn PoseSource>,
    latest: Arc<LatestPose>,
    config: SourceConfig,
    cancellation_token: CancellationToken,
}

impl CaptureTask {
    pub fn new(
        source: Box<dyn PoseSource>,
        latest: Arc<LatestPose>,
        config: SourceConfig,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            source,
            latest,
            config,
            cancellation_token,
        }
    }

    /// Read until the source is exhausted, fails, or the session is cancelled.
    /// The slot is closed on every exit path.
    pub async fn run(mut self) -> CaptureOutcome {
        info!(
            "Capture started (source: {}, fps: {}, drop_stale: {})",
            self.source.name(),
            self.config.fps,
            self.config.drop_stale
        );

        let mut pacing = pacing_interval(self.config.fps);
        let error = self.capture_loop(&mut pacing).await;

        let stats = self.source.stats();
        self.latest.close();

        info!(
            "Capture stopped after {} frames ({} malformed lines)",
            stats.frames_read, stats.malformed_lines
        );
        CaptureOutcome { stats, error }
    }

    async fn capture_loop(&mut self, pacing: &mut Option<Interval>) -> Option<SourceError> {
        let token = self.cancellation_token.clone();

        loop {
            if let Some(pacing) = pacing.as_mut() {
                tokio::select! {
                    _ = token.cancelled() => return None,
                    _ = pacing.tick() => {}
                }
            }

            let next = tokio::select! {
                _ = token.cancelled() => return None,
                next = self.source.next_frame() => next,
            };

            match next {
                Ok(Some(frame)) => {
                    let frame_id = frame.id;
                    self.latest.publish(frame).await;

                    if !self.config.drop_stale {
                        tokio::select! {
                            _ = token.cancelled() => return None,
                            _ = self.latest.wait_until_taken(frame_id) => {}
                        }
                    }
                }
                Ok(None) => {
                    debug!("Source {} reached end of stream", self.source.name());
                    return None;
                }
                Err(e) => {
                    error!("Source {} failed: {}", self.source.name(), e);
                    return Some(e);
                }
            }
        }
    }
}

fn pacing_interval(fps: u32) -> Option<Interval> {
    if fps == 0 {
        return None;
    }
    let mut pacing = interval(Duration::from_secs_f64(1.0 / fps as f64));
    pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(pacing)
}
