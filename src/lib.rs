pub mod analyzer;
pub mod config;
pub mod error;
pub mod events;
pub mod feedback;
pub mod pose;
pub mod render;
pub mod session;
pub mod source;

pub use analyzer::{FrameAnalysis, KneeBand, Posture, SquatAnalyzer};
pub use config::{AnnouncerKind, BodySide, RepcamConfig};
pub use error::{EventBusError, RepcamError, Result, SourceError};
pub use events::{EventBus, EventFilter, EventReceiver, RepcamEvent};
pub use feedback::{
    announcer_from_config, Announcer, Feedback, FeedbackIntegration, FeedbackSink, FormCue,
    Phrases,
};
pub use pose::{Keypoint, KeypointKind, Pose, PoseFrame};
pub use render::RenderIntegration;
pub use session::{Session, SessionSummary, StopReason};
pub use source::{open_source, JsonLinesSource, LatestPose, PoseSource, ScriptedSource};
