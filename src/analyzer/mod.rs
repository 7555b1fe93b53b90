mod angles;
mod squat;
#[cfg(test)]
mod tests;

pub use angles::{back_angle, joint_angle, knee_angle};
pub use squat::{FrameAnalysis, KneeBand, Posture, SquatAnalyzer};
