use super::*;
use crate::config::{AnalyzerConfig, BodySide};
use crate::feedback::{Feedback, FormCue};
use crate::pose::{Keypoint, KeypointKind, Pose};

const CONFIDENT: f64 = 0.9;

/// Left-side pose with an upright torso and the given knee/ankle placement
fn leg_pose(knee: (f64, f64), ankle: (f64, f64)) -> Pose {
    Pose::uniform(0.0)
        .with(KeypointKind::LeftShoulder, Keypoint::new(0.0, -1.0, CONFIDENT))
        .with(KeypointKind::LeftHip, Keypoint::new(0.0, 0.0, CONFIDENT))
        .with(KeypointKind::LeftKnee, Keypoint::new(knee.0, knee.1, CONFIDENT))
        .with(KeypointKind::LeftAnkle, Keypoint::new(ankle.0, ankle.1, CONFIDENT))
}

fn standing() -> Pose {
    leg_pose((0.0, 1.0), (0.0, 2.0))
}

fn squatting() -> Pose {
    leg_pose((0.0, 1.0), (1.0, 1.0))
}

/// Knee bent to roughly 130 degrees, inside the hysteresis band
fn half_squat() -> Pose {
    let radians = 130f64.to_radians();
    // ankle heading measured from the hip heading (straight up, -90 degrees)
    let heading = -std::f64::consts::FRAC_PI_2 + radians;
    leg_pose((0.0, 1.0), (heading.cos(), 1.0 + heading.sin()))
}

fn leaning(pose: Pose) -> Pose {
    pose.with(KeypointKind::LeftShoulder, Keypoint::new(1.0, -1.0, CONFIDENT))
}

fn with_score(mut pose: Pose, kind: KeypointKind, score: f64) -> Pose {
    if let Some(kp) = pose.keypoints.get_mut(kind.idx()) {
        kp.score = score;
    }
    pose
}

fn analyzer() -> SquatAnalyzer {
    SquatAnalyzer::new(AnalyzerConfig::default())
}

#[test]
fn test_initial_state() {
    let analyzer = analyzer();
    assert_eq!(analyzer.posture(), Posture::Up);
    assert_eq!(analyzer.rep_count(), 0);
    assert!(analyzer.last_knee_angle().is_none());
    assert!(!analyzer.back_fault());
}

#[test]
fn test_straight_bent_straight_counts_one_rep() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    let first = analyzer.process_frame(Some(&standing()), &mut feedback);
    assert_eq!(first.posture, Posture::Up);
    assert_eq!(first.rep_count, 0);
    assert_eq!(first.knee_band, KneeBand::Extended);
    assert!(feedback.is_empty());

    let second = analyzer.process_frame(Some(&squatting()), &mut feedback);
    assert_eq!(second.posture, Posture::Down);
    assert_eq!(second.knee_band, KneeBand::Flexed);
    assert_eq!(second.rep_count, 0);

    let third = analyzer.process_frame(Some(&standing()), &mut feedback);
    assert_eq!(third.posture, Posture::Up);
    assert_eq!(third.rep_count, 1);
    assert!(third.rep_completed);

    assert_eq!(
        feedback,
        vec![Feedback::Cue(FormCue::Descending), Feedback::RepCounted(1)]
    );
}

#[test]
fn test_gradual_descent_counts_once() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    // knee angle sweeps 180 -> 80 -> 180 in 5 degree steps
    let down = (80..=180).rev().step_by(5);
    let up = (80..=180).step_by(5);
    for degrees in down.chain(up) {
        let heading = -std::f64::consts::FRAC_PI_2 + (degrees as f64).to_radians();
        let pose = leg_pose((0.0, 1.0), (heading.cos(), 1.0 + heading.sin()));
        analyzer.process_frame(Some(&pose), &mut feedback);
    }

    assert_eq!(analyzer.rep_count(), 1);
    assert_eq!(
        feedback,
        vec![Feedback::Cue(FormCue::Descending), Feedback::RepCounted(1)]
    );
}

#[test]
fn test_repeated_frames_in_a_state_do_not_count() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    for _ in 0..10 {
        analyzer.process_frame(Some(&standing()), &mut feedback);
    }
    assert_eq!(analyzer.rep_count(), 0);

    for _ in 0..10 {
        analyzer.process_frame(Some(&squatting()), &mut feedback);
    }
    assert_eq!(analyzer.rep_count(), 0);
    assert_eq!(feedback, vec![Feedback::Cue(FormCue::Descending)]);

    for _ in 0..10 {
        analyzer.process_frame(Some(&standing()), &mut feedback);
    }
    assert_eq!(analyzer.rep_count(), 1);
}

#[test]
fn test_hysteresis_band_holds_posture() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    let analysis = analyzer.process_frame(Some(&half_squat()), &mut feedback);
    assert_eq!(analysis.knee_band, KneeBand::Transitional);
    assert_eq!(analysis.posture, Posture::Up);

    analyzer.process_frame(Some(&squatting()), &mut feedback);
    for _ in 0..5 {
        let analysis = analyzer.process_frame(Some(&half_squat()), &mut feedback);
        assert_eq!(analysis.posture, Posture::Down);
        assert_eq!(analysis.rep_count, 0);
    }
}

#[test]
fn test_low_confidence_frame_keeps_last_knee_angle() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&standing()), &mut feedback);
    analyzer.process_frame(Some(&squatting()), &mut feedback);
    let bent = analyzer.last_knee_angle();

    // noisy frame: knee looks straight but the ankle is barely detected
    let noisy = with_score(standing(), KeypointKind::LeftAnkle, 0.2);
    let analysis = analyzer.process_frame(Some(&noisy), &mut feedback);
    assert_eq!(analysis.posture, Posture::Down);
    assert_eq!(analysis.knee_angle, bent);
    assert_eq!(analysis.rep_count, 0);

    analyzer.process_frame(Some(&standing()), &mut feedback);
    assert_eq!(analyzer.rep_count(), 1);
}

#[test]
fn test_confidence_threshold_is_exclusive() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    let borderline = with_score(standing(), KeypointKind::LeftKnee, 0.3);
    analyzer.process_frame(Some(&borderline), &mut feedback);
    assert!(analyzer.last_knee_angle().is_none());
}

#[test]
fn test_zero_confidence_frames_change_nothing() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&standing()), &mut feedback);
    analyzer.process_frame(Some(&squatting()), &mut feedback);
    let before = (analyzer.posture(), analyzer.rep_count(), analyzer.last_knee_angle());
    feedback.clear();

    let blank = Pose::uniform(0.0);
    for _ in 0..100 {
        let analysis = analyzer.process_frame(Some(&blank), &mut feedback);
        assert_eq!(analysis.posture, before.0);
        assert_eq!(analysis.rep_count, before.1);
    }

    assert_eq!(
        (analyzer.posture(), analyzer.rep_count(), analyzer.last_knee_angle()),
        before
    );
    assert!(feedback.is_empty());
}

#[test]
fn test_zero_confidence_from_start_stays_up() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    for _ in 0..100 {
        let analysis = analyzer.process_frame(Some(&Pose::uniform(0.0)), &mut feedback);
        assert_eq!(analysis.posture, Posture::Up);
        assert_eq!(analysis.knee_band, KneeBand::Unknown);
        assert_eq!(analysis.rep_count, 0);
    }
    assert!(feedback.is_empty());
}

#[test]
fn test_missing_pose_is_skipped() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&standing()), &mut feedback);
    analyzer.process_frame(Some(&squatting()), &mut feedback);

    let analysis = analyzer.process_frame(None, &mut feedback);
    assert!(!analysis.pose_present);
    assert_eq!(analysis.posture, Posture::Down);
    assert_eq!(analyzer.frames_without_pose(), 1);
    assert_eq!(analyzer.frames_processed(), 2);
}

#[test]
fn test_truncated_pose_is_tolerated() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    let truncated = Pose::new(vec![Keypoint::new(1.0, 1.0, CONFIDENT); 5]);
    let analysis = analyzer.process_frame(Some(&truncated), &mut feedback);
    assert!(analysis.pose_present);
    assert_eq!(analysis.knee_band, KneeBand::Unknown);
}

#[test]
fn test_back_warning_fires_once_per_episode() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&standing()), &mut feedback);
    for _ in 0..25 {
        let analysis = analyzer.process_frame(Some(&leaning(standing())), &mut feedback);
        assert!(analysis.back_fault);
    }
    assert_eq!(feedback, vec![Feedback::Cue(FormCue::StraightenBack)]);

    // fault clears, then a second episode warns again
    analyzer.process_frame(Some(&standing()), &mut feedback);
    assert!(!analyzer.back_fault());
    analyzer.process_frame(Some(&leaning(standing())), &mut feedback);
    analyzer.process_frame(Some(&leaning(standing())), &mut feedback);

    assert_eq!(
        feedback,
        vec![
            Feedback::Cue(FormCue::StraightenBack),
            Feedback::Cue(FormCue::StraightenBack)
        ]
    );
}

#[test]
fn test_single_frame_fault_episode_warns() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&leaning(standing())), &mut feedback);
    analyzer.process_frame(Some(&standing()), &mut feedback);

    assert_eq!(feedback, vec![Feedback::Cue(FormCue::StraightenBack)]);
}

#[test]
fn test_low_confidence_shoulder_keeps_fault_latched() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&leaning(standing())), &mut feedback);
    let hidden = with_score(standing(), KeypointKind::LeftShoulder, 0.1);
    analyzer.process_frame(Some(&hidden), &mut feedback);
    assert!(analyzer.back_fault());

    analyzer.process_frame(Some(&leaning(standing())), &mut feedback);
    assert_eq!(feedback, vec![Feedback::Cue(FormCue::StraightenBack)]);
}

#[test]
fn test_back_fault_blocks_descent() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&standing()), &mut feedback);
    let analysis = analyzer.process_frame(Some(&leaning(squatting())), &mut feedback);
    assert_eq!(analysis.posture, Posture::Up);
    assert_eq!(feedback, vec![Feedback::Cue(FormCue::StraightenBack)]);

    // straightening while still bent completes the descent
    let analysis = analyzer.process_frame(Some(&squatting()), &mut feedback);
    assert_eq!(analysis.posture, Posture::Down);

    analyzer.process_frame(Some(&standing()), &mut feedback);
    assert_eq!(analyzer.rep_count(), 1);
}

#[test]
fn test_back_fault_does_not_block_rep_completion() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&standing()), &mut feedback);
    analyzer.process_frame(Some(&squatting()), &mut feedback);
    let analysis = analyzer.process_frame(Some(&leaning(standing())), &mut feedback);

    assert_eq!(analysis.rep_count, 1);
    assert!(analysis.back_fault);
}

#[test]
fn test_several_reps_are_numbered() {
    let mut analyzer = analyzer();
    let mut feedback: Vec<Feedback> = Vec::new();

    for _ in 0..3 {
        analyzer.process_frame(Some(&standing()), &mut feedback);
        analyzer.process_frame(Some(&squatting()), &mut feedback);
    }
    analyzer.process_frame(Some(&standing()), &mut feedback);

    let counts: Vec<u32> = feedback
        .iter()
        .filter_map(|f| match f {
            Feedback::RepCounted(n) => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(counts, vec![1, 2, 3]);
}

#[test]
fn test_right_side_measurement() {
    let config = AnalyzerConfig {
        side: BodySide::Right,
        ..AnalyzerConfig::default()
    };
    let mut analyzer = SquatAnalyzer::new(config);
    let mut feedback: Vec<Feedback> = Vec::new();

    // left leg squats, right leg stays hidden: nothing is measured
    analyzer.process_frame(Some(&squatting()), &mut feedback);
    assert!(analyzer.last_knee_angle().is_none());

    let right_bent = Pose::uniform(0.0)
        .with(KeypointKind::RightShoulder, Keypoint::new(0.0, -1.0, CONFIDENT))
        .with(KeypointKind::RightHip, Keypoint::new(0.0, 0.0, CONFIDENT))
        .with(KeypointKind::RightKnee, Keypoint::new(0.0, 1.0, CONFIDENT))
        .with(KeypointKind::RightAnkle, Keypoint::new(1.0, 1.0, CONFIDENT));
    let analysis = analyzer.process_frame(Some(&right_bent), &mut feedback);
    assert_eq!(analysis.posture, Posture::Down);
}

fn measured_knee(pose: &Pose) -> f64 {
    knee_angle(
        pose.keypoint(KeypointKind::LeftHip).unwrap(),
        pose.keypoint(KeypointKind::LeftKnee).unwrap(),
        pose.keypoint(KeypointKind::LeftAnkle).unwrap(),
    )
}

fn measured_back(pose: &Pose) -> f64 {
    back_angle(
        pose.keypoint(KeypointKind::LeftShoulder).unwrap(),
        pose.keypoint(KeypointKind::LeftHip).unwrap(),
        pose.keypoint(KeypointKind::LeftKnee).unwrap(),
    )
}

#[test]
fn test_knee_exactly_at_up_threshold_holds_posture() {
    let config = AnalyzerConfig {
        knee_up_angle: measured_knee(&standing()),
        ..AnalyzerConfig::default()
    };
    let mut analyzer = SquatAnalyzer::new(config);
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&squatting()), &mut feedback);
    assert_eq!(analyzer.posture(), Posture::Down);

    let analysis = analyzer.process_frame(Some(&standing()), &mut feedback);
    assert_eq!(analysis.posture, Posture::Down);
    assert_eq!(analysis.knee_band, KneeBand::Transitional);
    assert_eq!(analyzer.rep_count(), 0);
    assert!(!feedback.iter().any(|f| matches!(f, Feedback::RepCounted(_))));
}

#[test]
fn test_knee_exactly_at_down_threshold_holds_posture() {
    let config = AnalyzerConfig {
        knee_down_angle: measured_knee(&squatting()),
        ..AnalyzerConfig::default()
    };
    let mut analyzer = SquatAnalyzer::new(config);
    let mut feedback: Vec<Feedback> = Vec::new();

    analyzer.process_frame(Some(&standing()), &mut feedback);
    let analysis = analyzer.process_frame(Some(&squatting()), &mut feedback);

    assert_eq!(analysis.posture, Posture::Up);
    assert_eq!(analysis.knee_band, KneeBand::Transitional);
    assert!(feedback.is_empty());
}

#[test]
fn test_back_exactly_at_lower_bound_is_a_fault() {
    let upright = measured_back(&standing());

    let mut analyzer = SquatAnalyzer::new(AnalyzerConfig {
        back_straight_min: upright,
        back_straight_max: 180.0,
        ..AnalyzerConfig::default()
    });
    let mut feedback: Vec<Feedback> = Vec::new();
    analyzer.process_frame(Some(&standing()), &mut feedback);
    assert!(analyzer.back_fault());
    assert_eq!(feedback, vec![Feedback::Cue(FormCue::StraightenBack)]);

    // one degree lower and the same pose reads as straight
    let mut analyzer = SquatAnalyzer::new(AnalyzerConfig {
        back_straight_min: upright + 1.0,
        ..AnalyzerConfig::default()
    });
    analyzer.process_frame(Some(&standing()), &mut Vec::<Feedback>::new());
    assert!(!analyzer.back_fault());
}

#[test]
fn test_back_exactly_at_upper_bound_is_a_fault() {
    let pose = leaning(standing());
    let lean = measured_back(&pose);

    let mut analyzer = SquatAnalyzer::new(AnalyzerConfig {
        back_straight_max: lean,
        ..AnalyzerConfig::default()
    });
    analyzer.process_frame(Some(&pose), &mut Vec::<Feedback>::new());
    assert!(analyzer.back_fault());

    let mut analyzer = SquatAnalyzer::new(AnalyzerConfig {
        back_straight_max: lean - 1.0,
        ..AnalyzerConfig::default()
    });
    analyzer.process_frame(Some(&pose), &mut Vec::<Feedback>::new());
    assert!(!analyzer.back_fault());
}
