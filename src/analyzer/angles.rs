//! Joint angle geometry on 2D keypoints.

use crate::pose::Keypoint;

/// Angle in degrees at `vertex` between the rays to `from` and `to`.
///
/// Computed as the absolute difference of the two ray headings, so the result
/// lies in `[0, 360)` and is not folded onto `[0, 180]`. A straight segment
/// through the vertex yields 180.
pub fn joint_angle(from: &Keypoint, vertex: &Keypoint, to: &Keypoint) -> f64 {
    heading_difference(from, vertex, to).abs()
}

/// Knee flexion: angle at the knee between hip and ankle.
pub fn knee_angle(hip: &Keypoint, knee: &Keypoint, ankle: &Keypoint) -> f64 {
    joint_angle(hip, knee, ankle)
}

/// Torso-to-thigh angle at the hip, folded into `[0, 180)`.
///
/// Values near 0 or near 180 both describe shoulder, hip and knee on one line.
/// Folded with a euclidean remainder, not a sign-keeping `%`, so negative
/// differences land in `[0, 180)` as well.
pub fn back_angle(shoulder: &Keypoint, hip: &Keypoint, knee: &Keypoint) -> f64 {
    heading_difference(shoulder, hip, knee).rem_euclid(180.0)
}

// heading(vertex -> to) - heading(vertex -> from), in degrees
fn heading_difference(from: &Keypoint, vertex: &Keypoint, to: &Keypoint) -> f64 {
    let to_heading = (to.y - vertex.y).atan2(to.x - vertex.x);
    let from_heading = (from.y - vertex.y).atan2(from.x - vertex.x);
    (to_heading - from_heading).to_degrees()
}
