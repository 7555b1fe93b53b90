//! Text rendering of the analyzer's state for on-screen or console overlays.

use crate::analyzer::FrameAnalysis;
use crate::config::RenderConfig;
use crate::error::EventBusError;
use crate::events::{EventFilter, EventReceiver, RepcamEvent};
use crate::pose::{constants::SKELETON_EDGES, Keypoint, KeypointKind, Pose};

use tracing::{debug, info, warn};

/// A skeleton line segment between two confident keypoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: KeypointKind,
    pub to: KeypointKind,
    pub start: (f64, f64),
    pub end: (f64, f64),
}

/// Counter text shown over the video
pub fn status_line(analysis: &FrameAnalysis, loading_text: &str) -> String {
    if analysis.pose_present {
        format!("Squats completed: {}", analysis.rep_count)
    } else {
        loading_text.to_string()
    }
}

/// Keypoints confident enough to draw as markers
pub fn visible_keypoints(pose: &Pose, threshold: f64) -> Vec<(KeypointKind, Keypoint)> {
    KeypointKind::ALL
        .iter()
        .filter_map(|&kind| pose.confident(kind, threshold).map(|kp| (kind, *kp)))
        .collect()
}

/// Skeleton edges whose endpoints both exceed `threshold`
pub fn visible_edges(pose: &Pose, threshold: f64) -> Vec<Segment> {
    SKELETON_EDGES
        .iter()
        .filter_map(|&(from, to)| {
            let a = pose.confident(from, threshold)?;
            let b = pose.confident(to, threshold)?;
            Some(Segment {
                from,
                to,
                start: (a.x, a.y),
                end: (b.x, b.y),
            })
        })
        .collect()
}

/// Consumes analyzed frames and logs the overlay whenever it changes
pub struct RenderIntegration {
    config: RenderConfig,
    loading_text: String,
    receiver: EventReceiver,
    last_status: Option<String>,
}

impl RenderIntegration {
    pub fn filter() -> EventFilter {
        EventFilter::EventTypes(vec!["frame_analyzed", "session_ended"])
    }

    pub fn new(config: RenderConfig, loading_text: String, receiver: EventReceiver) -> Self {
        Self {
            config,
            loading_text,
            receiver,
            last_status: None,
        }
    }

    /// Render frames until the session ends. Returns the number of frames rendered.
    pub async fn run(mut self) -> u64 {
        let mut rendered = 0u64;

        loop {
            match self.receiver.recv().await {
                Ok(RepcamEvent::FrameAnalyzed {
                    frame_id,
                    analysis,
                    pose,
                    ..
                }) => {
                    self.render(frame_id, &analysis, pose.as_ref());
                    rendered += 1;
                }
                Ok(RepcamEvent::SessionEnded { .. }) => break,
                Ok(_) => {}
                Err(EventBusError::Lagged { skipped }) => {
                    debug!("Renderer dropped {} frames", skipped);
                }
                Err(e) => {
                    warn!("Render task stopping: {}", e);
                    break;
                }
            }
        }

        rendered
    }

    fn render(&mut self, frame_id: u64, analysis: &FrameAnalysis, pose: Option<&Pose>) {
        let status = status_line(analysis, &self.loading_text);
        if self.last_status.as_deref() != Some(status.as_str()) {
            info!("{}", status);
            self.last_status = Some(status);
        }

        if let Some(pose) = pose {
            debug!(
                "Frame {}: {} keypoints, {} skeleton edges, knee {:?}, back {:?}{}",
                frame_id,
                visible_keypoints(pose, self.config.keypoint_threshold).len(),
                visible_edges(pose, self.config.skeleton_threshold).len(),
                analysis.knee_angle,
                analysis.back_angle,
                if analysis.back_fault {
                    " (back highlighted)"
                } else {
                    ""
                }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{KneeBand, Posture};
    use crate::config::RepcamConfig;
    use crate::events::EventBus;
    use std::time::SystemTime;

    fn analysis(pose_present: bool, rep_count: u32) -> FrameAnalysis {
        FrameAnalysis {
            pose_present,
            posture: Posture::Up,
            knee_band: KneeBand::Extended,
            rep_count,
            rep_completed: false,
            knee_angle: Some(175.0),
            back_angle: Some(2.0),
            back_fault: false,
        }
    }

    #[test]
    fn test_status_line() {
        assert_eq!(
            status_line(&analysis(true, 4), "Loading, please wait..."),
            "Squats completed: 4"
        );
        assert_eq!(
            status_line(&analysis(false, 4), "Loading, please wait..."),
            "Loading, please wait..."
        );
    }

    #[test]
    fn test_edges_need_both_endpoints() {
        let pose = Pose::uniform(0.0)
            .with(KeypointKind::LeftHip, Keypoint::new(1.0, 1.0, 0.9))
            .with(KeypointKind::LeftKnee, Keypoint::new(1.0, 2.0, 0.6))
            .with(KeypointKind::LeftAnkle, Keypoint::new(1.0, 3.0, 0.4));

        let edges = visible_edges(&pose, 0.5);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from, KeypointKind::LeftHip);
        assert_eq!(edges[0].to, KeypointKind::LeftKnee);
        assert_eq!(edges[0].end, (1.0, 2.0));

        // keypoint markers use the lower threshold
        assert_eq!(visible_keypoints(&pose, 0.3).len(), 3);
    }

    #[test]
    fn test_full_confidence_draws_whole_skeleton() {
        let pose = Pose::uniform(1.0);
        assert_eq!(visible_edges(&pose, 0.5).len(), SKELETON_EDGES.len());
        assert_eq!(visible_keypoints(&pose, 0.3).len(), 17);
    }

    #[tokio::test]
    async fn test_render_task_counts_frames() {
        let bus = EventBus::new(16);
        let config = RepcamConfig::default();
        let task = RenderIntegration::new(
            config.render.clone(),
            config.feedback.startup_phrase.clone(),
            bus.subscribe_filtered(RenderIntegration::filter(), "render"),
        );
        let handle = tokio::spawn(task.run());

        for frame_id in 1..=3 {
            bus.publish(RepcamEvent::FrameAnalyzed {
                frame_id,
                analysis: analysis(true, 0),
                pose: Some(Pose::uniform(0.9)),
                timestamp: SystemTime::now(),
            })
            .unwrap();
        }
        bus.publish(RepcamEvent::SessionEnded {
            reps: 0,
            timestamp: SystemTime::now(),
        })
        .unwrap();

        assert_eq!(handle.await.unwrap(), 3);
    }
}
