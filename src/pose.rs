use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// The 17 standard body landmarks, in the order pose estimators emit them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

pub const NUM_KEYPOINTS: usize = 17;

impl KeypointKind {
    pub const ALL: [KeypointKind; NUM_KEYPOINTS] = [
        KeypointKind::Nose,
        KeypointKind::LeftEye,
        KeypointKind::RightEye,
        KeypointKind::LeftEar,
        KeypointKind::RightEar,
        KeypointKind::LeftShoulder,
        KeypointKind::RightShoulder,
        KeypointKind::LeftElbow,
        KeypointKind::RightElbow,
        KeypointKind::LeftWrist,
        KeypointKind::RightWrist,
        KeypointKind::LeftHip,
        KeypointKind::RightHip,
        KeypointKind::LeftKnee,
        KeypointKind::RightKnee,
        KeypointKind::LeftAnkle,
        KeypointKind::RightAnkle,
    ];

    /// Position of this landmark in a pose's keypoint list
    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            KeypointKind::Nose => "nose",
            KeypointKind::LeftEye => "left_eye",
            KeypointKind::RightEye => "right_eye",
            KeypointKind::LeftEar => "left_ear",
            KeypointKind::RightEar => "right_ear",
            KeypointKind::LeftShoulder => "left_shoulder",
            KeypointKind::RightShoulder => "right_shoulder",
            KeypointKind::LeftElbow => "left_elbow",
            KeypointKind::RightElbow => "right_elbow",
            KeypointKind::LeftWrist => "left_wrist",
            KeypointKind::RightWrist => "right_wrist",
            KeypointKind::LeftHip => "left_hip",
            KeypointKind::RightHip => "right_hip",
            KeypointKind::LeftKnee => "left_knee",
            KeypointKind::RightKnee => "right_knee",
            KeypointKind::LeftAnkle => "left_ankle",
            KeypointKind::RightAnkle => "right_ankle",
        }
    }
}

/// A detected landmark in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Detection confidence in [0, 1]
    #[serde(default)]
    pub score: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, score: f64) -> Self {
        Self { x, y, score }
    }

    /// Confidence strictly above `threshold`
    pub fn is_confident(&self, threshold: f64) -> bool {
        self.score > threshold
    }
}

/// All keypoints for one detected person in one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    /// Overall detection score, when the estimator reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self {
            keypoints,
            score: None,
        }
    }

    /// Build a pose with every landmark at the origin and the given score
    pub fn uniform(score: f64) -> Self {
        Self::new(vec![Keypoint::new(0.0, 0.0, score); NUM_KEYPOINTS])
    }

    pub fn keypoint(&self, kind: KeypointKind) -> Option<&Keypoint> {
        self.keypoints.get(kind.idx())
    }

    /// Returns the keypoint only if it clears the confidence threshold
    pub fn confident(&self, kind: KeypointKind, threshold: f64) -> Option<&Keypoint> {
        self.keypoint(kind).filter(|kp| kp.is_confident(threshold))
    }

    /// Replace a single landmark, growing the list if the estimator sent fewer than 17
    pub fn set(&mut self, kind: KeypointKind, keypoint: Keypoint) {
        let index = kind.idx();
        if self.keypoints.len() <= index {
            self.keypoints.resize(index + 1, Keypoint::default());
        }
        self.keypoints[index] = keypoint;
    }

    pub fn with(mut self, kind: KeypointKind, keypoint: Keypoint) -> Self {
        self.set(kind, keypoint);
        self
    }
}

/// One frame of pose estimates as delivered by a pose source
#[derive(Debug, Clone)]
pub struct PoseFrame {
    /// Monotonic frame identifier assigned by the source
    pub id: u64,
    pub timestamp: SystemTime,
    pub poses: Vec<Pose>,
}

impl PoseFrame {
    pub fn new(id: u64, timestamp: SystemTime, poses: Vec<Pose>) -> Self {
        Self {
            id,
            timestamp,
            poses,
        }
    }

    /// The pose the analyzer looks at. Only the first detected person is tracked.
    pub fn primary(&self) -> Option<&Pose> {
        self.poses.first()
    }

    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

pub mod constants {
    use super::KeypointKind::{self, *};

    /// Limb and torso segments drawn by the skeleton overlay
    pub const SKELETON_EDGES: [(KeypointKind, KeypointKind); 12] = [
        (LeftShoulder, LeftElbow),
        (LeftElbow, LeftWrist),
        (RightShoulder, RightElbow),
        (RightElbow, RightWrist),
        (LeftShoulder, RightShoulder),
        (LeftShoulder, LeftHip),
        (RightShoulder, RightHip),
        (LeftHip, RightHip),
        (LeftHip, LeftKnee),
        (LeftKnee, LeftAnkle),
        (RightHip, RightKnee),
        (RightKnee, RightAnkle),
    ];
}
