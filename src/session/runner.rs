use super::analysis::AnalysisTask;
use super::capture::CaptureTask;
use super::{SessionSummary, StopReason};
use crate::analyzer::SquatAnalyzer;
use crate::config::RepcamConfig;
use crate::error::{RepcamError, Result};
use crate::events::{EventBus, RepcamEvent};
use crate::feedback::{
    announcer_from_config, feedback_filter, Announcer, FeedbackIntegration, Phrases,
};
use crate::render::RenderIntegration;
use crate::source::{open_source, LatestPose, PoseSource};

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// One counting session: a pose source, the analyzer and its consumers
pub struct Session {
    config: RepcamConfig,
    session_id: Uuid,
    event_bus: Arc<EventBus>,
    /// Carries `FrameAnalyzed` apart from the feedback events
    frame_bus: Arc<EventBus>,
    latest: Arc<LatestPose>,
    source: Box<dyn PoseSource>,
    announcer: Arc<dyn Announcer>,
    pub(super) cancellation_token: CancellationToken,
    pub(super) stop_signal: Arc<Mutex<Option<StopReason>>>,
}

impl Session {
    pub fn new(
        config: RepcamConfig,
        source: Box<dyn PoseSource>,
        announcer: Arc<dyn Announcer>,
    ) -> Self {
        let capacity = config.system.event_bus_capacity;

        Self {
            config,
            session_id: Uuid::new_v4(),
            event_bus: Arc::new(EventBus::new(capacity)),
            frame_bus: Arc::new(EventBus::new(capacity)),
            latest: Arc::new(LatestPose::new()),
            source,
            announcer,
            cancellation_token: CancellationToken::new(),
            stop_signal: Arc::new(Mutex::new(None)),
        }
    }

    /// Validate the configuration, then open its source and announcer
    pub async fn from_config(config: RepcamConfig) -> Result<Self> {
        config.validate()?;
        let source = open_source(&config.source).await?;
        let announcer = announcer_from_config(&config.feedback);
        Ok(Self::new(config, source, announcer))
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Token that stops the session when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Run until the source is exhausted or the session is cancelled
    pub async fn run(self) -> Result<SessionSummary> {
        let Session {
            config,
            session_id,
            event_bus,
            frame_bus,
            latest,
            source,
            announcer,
            cancellation_token,
            stop_signal,
        } = self;

        let started_at = Utc::now();
        info!("Starting session {} (source: {})", session_id, source.name());

        // Subscribe consumers before anything is published
        let feedback = FeedbackIntegration::new(
            Phrases::from_config(&config.feedback),
            announcer,
            event_bus.subscribe_filtered(feedback_filter(), "feedback"),
        );
        let feedback_task = tokio::spawn(feedback.run());

        let render_task = if config.render.enabled {
            let render = RenderIntegration::new(
                config.render.clone(),
                config.feedback.startup_phrase.clone(),
                frame_bus.subscribe_filtered(RenderIntegration::filter(), "render"),
            );
            Some(tokio::spawn(render.run()))
        } else {
            None
        };

        if let Err(e) = event_bus.publish(RepcamEvent::SessionStarted {
            session_id,
            timestamp: SystemTime::now(),
        }) {
            warn!("Failed to publish session start: {}", e);
        }

        let capture_task = tokio::spawn(
            CaptureTask::new(
                source,
                Arc::clone(&latest),
                config.source.clone(),
                cancellation_token.clone(),
            )
            .run(),
        );
        let analysis_task = tokio::spawn(
            AnalysisTask::new(
                SquatAnalyzer::new(config.analyzer.clone()),
                Arc::clone(&latest),
                Arc::clone(&event_bus),
                config.render.enabled.then(|| Arc::clone(&frame_bus)),
                cancellation_token.clone(),
            )
            .run(),
        );

        let capture = capture_task
            .await
            .map_err(|e| RepcamError::system(format!("Capture task failed: {}", e)))?;
        let analyzer = match analysis_task.await {
            Ok(analyzer) => analyzer,
            Err(e) => {
                cancellation_token.cancel();
                return Err(RepcamError::system(format!("Analysis task failed: {}", e)));
            }
        };

        for bus in [&event_bus, &frame_bus] {
            if !bus.has_subscribers() {
                continue;
            }
            if let Err(e) = bus.publish(RepcamEvent::SessionEnded {
                reps: analyzer.rep_count(),
                timestamp: SystemTime::now(),
            }) {
                warn!("Failed to publish session end: {}", e);
            }
        }

        let announcements = drain("feedback", feedback_task).await.unwrap_or(0);
        if let Some(render_task) = render_task {
            if let Some(rendered) = drain("render", render_task).await {
                debug!("Renderer drew {} frames", rendered);
            }
        }

        let stop_reason = match (&capture.error, stop_signal.lock().await.take()) {
            (Some(e), _) => StopReason::SourceFailure(e.to_string()),
            (None, Some(signal)) => signal,
            (None, None) if cancellation_token.is_cancelled() => StopReason::Cancelled,
            (None, None) => StopReason::EndOfStream,
        };

        let summary = SessionSummary {
            session_id,
            started_at,
            ended_at: Utc::now(),
            reps: analyzer.rep_count(),
            frames_read: capture.stats.frames_read,
            frames_analyzed: analyzer.frames_processed() + analyzer.frames_without_pose(),
            frames_without_pose: analyzer.frames_without_pose(),
            frames_skipped: latest.stats().overwritten,
            malformed_lines: capture.stats.malformed_lines,
            announcements,
            stop_reason,
        };

        match capture.error {
            Some(e) => {
                error!("Session {} ended by source failure", session_id);
                summary.log();
                Err(e.into())
            }
            None => Ok(summary),
        }
    }
}

/// Wait for a consumer task to finish after `SessionEnded`
async fn drain<T, F>(component: &str, task: F) -> Option<T>
where
    F: Future<Output = std::result::Result<T, tokio::task::JoinError>>,
{
    match timeout(DRAIN_TIMEOUT, task).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!("{} task failed: {}", component, e);
            None
        }
        Err(_) => {
            warn!("{} task did not finish within {:?}", component, DRAIN_TIMEOUT);
            None
        }
    }
}
