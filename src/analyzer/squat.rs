use super::angles::{back_angle, knee_angle};
use crate::config::{AnalyzerConfig, BodySide};
use crate::feedback::{FeedbackSink, FormCue};
use crate::pose::{KeypointKind, Pose};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

/// Latched squat posture. Only changes when a threshold is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posture {
    Up,
    Down,
}

/// Where the last known knee angle sits relative to the thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KneeBand {
    /// No confident knee measurement yet
    Unknown,
    /// Above the up threshold
    Extended,
    /// Between thresholds (inclusive); posture holds
    Transitional,
    /// Below the down threshold
    Flexed,
}

/// Per-frame result handed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub pose_present: bool,
    pub posture: Posture,
    pub knee_band: KneeBand,
    pub rep_count: u32,
    pub rep_completed: bool,
    pub knee_angle: Option<f64>,
    pub back_angle: Option<f64>,
    pub back_fault: bool,
}

/// Landmarks measured for one side of the body
#[derive(Debug, Clone, Copy)]
struct SideJoints {
    shoulder: KeypointKind,
    hip: KeypointKind,
    knee: KeypointKind,
    ankle: KeypointKind,
}

impl SideJoints {
    fn for_side(side: BodySide) -> Self {
        match side {
            BodySide::Left => Self {
                shoulder: KeypointKind::LeftShoulder,
                hip: KeypointKind::LeftHip,
                knee: KeypointKind::LeftKnee,
                ankle: KeypointKind::LeftAnkle,
            },
            BodySide::Right => Self {
                shoulder: KeypointKind::RightShoulder,
                hip: KeypointKind::RightHip,
                knee: KeypointKind::RightKnee,
                ankle: KeypointKind::RightAnkle,
            },
        }
    }
}

/// Squat repetition counter over a stream of poses.
///
/// Holds all session state: posture, rep count, last confident angles and the
/// back warning latch. Low-confidence or missing landmarks never reset any of
/// it; the affected measurement simply keeps its previous value.
pub struct SquatAnalyzer {
    config: AnalyzerConfig,
    joints: SideJoints,
    posture: Posture,
    rep_count: u32,
    last_knee_angle: Option<f64>,
    last_back_angle: Option<f64>,
    back_fault: bool,
    back_warning_latched: bool,
    frames_processed: u64,
    frames_without_pose: u64,
}

impl SquatAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        debug!("Creating squat analyzer with config: {:?}", config);

        Self {
            joints: SideJoints::for_side(config.side),
            config,
            posture: Posture::Up,
            rep_count: 0,
            last_knee_angle: None,
            last_back_angle: None,
            back_fault: false,
            back_warning_latched: false,
            frames_processed: 0,
            frames_without_pose: 0,
        }
    }

    /// Analyze one frame's pose, reporting completed reps and cues to `sink`.
    ///
    /// `None` means nobody was detected; the frame is counted and skipped.
    pub fn process_frame<S>(&mut self, pose: Option<&Pose>, sink: &mut S) -> FrameAnalysis
    where
        S: FeedbackSink + ?Sized,
    {
        let Some(pose) = pose else {
            self.frames_without_pose += 1;
            trace!("No pose in frame, holding state");
            return self.snapshot(false, false);
        };

        self.frames_processed += 1;

        self.update_knee_angle(pose);
        self.update_back_angle(pose, sink);
        let rep_completed = self.check_up_position(sink);
        self.check_down_position(sink);

        trace!(
            "Frame analyzed: posture={:?} knee={:?} back={:?} fault={}",
            self.posture,
            self.last_knee_angle,
            self.last_back_angle,
            self.back_fault
        );

        self.snapshot(true, rep_completed)
    }

    fn update_knee_angle(&mut self, pose: &Pose) {
        let threshold = self.config.confidence_threshold;
        let (Some(hip), Some(knee), Some(ankle)) = (
            pose.confident(self.joints.hip, threshold),
            pose.confident(self.joints.knee, threshold),
            pose.confident(self.joints.ankle, threshold),
        ) else {
            trace!("Knee landmarks below confidence, keeping last angle");
            return;
        };

        self.last_knee_angle = Some(knee_angle(hip, knee, ankle));
    }

    fn update_back_angle<S>(&mut self, pose: &Pose, sink: &mut S)
    where
        S: FeedbackSink + ?Sized,
    {
        let threshold = self.config.confidence_threshold;
        let (Some(shoulder), Some(hip), Some(knee)) = (
            pose.confident(self.joints.shoulder, threshold),
            pose.confident(self.joints.hip, threshold),
            pose.confident(self.joints.knee, threshold),
        ) else {
            trace!("Back landmarks below confidence, keeping fault flag");
            return;
        };

        let angle = back_angle(shoulder, hip, knee);
        self.last_back_angle = Some(angle);

        let straight =
            angle < self.config.back_straight_min || angle > self.config.back_straight_max;

        if straight {
            if self.back_fault {
                debug!("Back straightened ({:.1} degrees)", angle);
            }
            self.back_fault = false;
            self.back_warning_latched = false;
            return;
        }

        self.back_fault = true;
        if !self.back_warning_latched {
            info!("Back fault detected ({:.1} degrees)", angle);
            sink.on_form_cue(FormCue::StraightenBack);
            self.back_warning_latched = true;
        }
    }

    // Returns true when this frame completed a repetition
    fn check_up_position<S>(&mut self, sink: &mut S) -> bool
    where
        S: FeedbackSink + ?Sized,
    {
        let Some(knee) = self.last_knee_angle else {
            return false;
        };
        if knee <= self.config.knee_up_angle {
            return false;
        }

        let completed = self.posture == Posture::Down;
        if completed {
            self.rep_count += 1;
            info!("Repetition {} completed", self.rep_count);
            sink.on_rep_counted(self.rep_count);
        }
        self.posture = Posture::Up;
        completed
    }

    fn check_down_position<S>(&mut self, sink: &mut S)
    where
        S: FeedbackSink + ?Sized,
    {
        let Some(knee) = self.last_knee_angle else {
            return;
        };
        if self.back_fault || knee >= self.config.knee_down_angle {
            return;
        }

        if self.posture == Posture::Up {
            debug!("Descended into squat (knee {:.1} degrees)", knee);
            sink.on_form_cue(FormCue::Descending);
        }
        self.posture = Posture::Down;
    }

    fn knee_band(&self) -> KneeBand {
        match self.last_knee_angle {
            None => KneeBand::Unknown,
            Some(angle) if angle > self.config.knee_up_angle => KneeBand::Extended,
            Some(angle) if angle < self.config.knee_down_angle => KneeBand::Flexed,
            Some(_) => KneeBand::Transitional,
        }
    }

    fn snapshot(&self, pose_present: bool, rep_completed: bool) -> FrameAnalysis {
        FrameAnalysis {
            pose_present,
            posture: self.posture,
            knee_band: self.knee_band(),
            rep_count: self.rep_count,
            rep_completed,
            knee_angle: self.last_knee_angle,
            back_angle: self.last_back_angle,
            back_fault: self.back_fault,
        }
    }

    pub fn posture(&self) -> Posture {
        self.posture
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn last_knee_angle(&self) -> Option<f64> {
        self.last_knee_angle
    }

    pub fn back_fault(&self) -> bool {
        self.back_fault
    }

    /// Frames that carried a pose
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_without_pose(&self) -> u64 {
        self.frames_without_pose
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}
