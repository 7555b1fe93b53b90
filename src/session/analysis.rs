use crate::analyzer::SquatAnalyzer;
use crate::events::{EventBus, RepcamEvent};
use crate::feedback::Feedback;
use crate::pose::PoseFrame;
use crate::source::LatestPose;

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Owns the analyzer and feeds it the newest frame from the slot
pub(super) struct AnalysisTask {
    analyzer: SquatAnalyzer,
    latest: Arc<LatestPose>,
    event_bus: Arc<EventBus>,
    frame_bus: Option<Arc<EventBus>>,
    cancellation_token: CancellationToken,
    feedback: Vec<Feedback>,
}

impl AnalysisTask {
    pub fn new(
        analyzer: SquatAnalyzer,
        latest: Arc<LatestPose>,
        event_bus: Arc<EventBus>,
        frame_bus: Option<Arc<EventBus>>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            analyzer,
            latest,
            event_bus,
            frame_bus,
            cancellation_token,
            feedback: Vec::new(),
        }
    }

    /// Analyze frames until the slot is closed and drained, or the session is
    /// cancelled. Hands the analyzer back for the summary.
    pub async fn run(mut self) -> SquatAnalyzer {
        let max_fps = self.analyzer.config().max_fps;
        let min_interval = (max_fps > 0).then(|| Duration::from_secs_f64(1.0 / max_fps as f64));
        let token = self.cancellation_token.clone();
        let mut last_frame_id = 0u64;

        info!("Analysis started (max_fps: {})", max_fps);

        loop {
            // Read before taking so a frame published just before close is not lost
            let closed = self.latest.is_closed();

            if let Some(frame) = self.latest.take_newer(last_frame_id).await {
                last_frame_id = frame.id;
                self.analyze(frame);

                if let Some(min_interval) = min_interval {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(min_interval) => {}
                    }
                }
                continue;
            }

            if closed {
                debug!("Pose slot closed and drained");
                break;
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.latest.wait_for_update() => {}
            }
        }

        info!(
            "Analysis stopped: {} reps over {} frames",
            self.analyzer.rep_count(),
            self.analyzer.frames_processed() + self.analyzer.frames_without_pose()
        );
        self.analyzer
    }

    fn analyze(&mut self, frame: PoseFrame) {
        let pose = frame.primary();
        let analysis = self.analyzer.process_frame(pose, &mut self.feedback);
        trace!(
            "Frame {} analyzed ({}ms old): {:?}",
            frame.id,
            frame.age_ms(),
            analysis
        );

        for item in self.feedback.drain(..) {
            let event = match item {
                Feedback::RepCounted(count) => RepcamEvent::RepCompleted {
                    count,
                    timestamp: SystemTime::now(),
                },
                Feedback::Cue(cue) => RepcamEvent::FormCue {
                    cue,
                    timestamp: SystemTime::now(),
                },
            };
            if let Err(e) = self.event_bus.publish(event) {
                debug!("Feedback event not delivered: {}", e);
            }
        }

        if let Some(frame_bus) = &self.frame_bus {
            let event = RepcamEvent::FrameAnalyzed {
                frame_id: frame.id,
                analysis,
                pose: pose.cloned(),
                timestamp: frame.timestamp,
            };
            if let Err(e) = frame_bus.publish(event) {
                debug!("Frame {} not delivered: {}", frame.id, e);
            }
        }
    }
}
