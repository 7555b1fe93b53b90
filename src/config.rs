use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RepcamConfig {
    pub source: SourceConfig,
    pub analyzer: AnalyzerConfig,
    pub feedback: FeedbackConfig,
    pub render: RenderConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    /// Path to a JSON-lines pose file, or "-" for stdin
    #[serde(default = "default_source_input")]
    pub input: String,

    /// Replay rate in frames per second (0 = as fast as frames arrive)
    #[serde(default = "default_source_fps")]
    pub fps: u32,

    /// Let newer frames replace ones the analyzer has not read yet.
    /// When false the reader waits for each frame to be analyzed.
    #[serde(default = "default_drop_stale")]
    pub drop_stale: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Maximum analysis rate (0 = analyze every new frame)
    #[serde(default = "default_analyzer_max_fps")]
    pub max_fps: u32,

    /// Keypoints must score strictly above this to be used in an angle
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Knee angle above which the subject is standing
    #[serde(default = "default_knee_up_angle")]
    pub knee_up_angle: f64,

    /// Knee angle below which the subject is squatting
    #[serde(default = "default_knee_down_angle")]
    pub knee_down_angle: f64,

    /// Back angles below this count as a straight line
    #[serde(default = "default_back_straight_min")]
    pub back_straight_min: f64,

    /// Back angles above this count as a straight line
    #[serde(default = "default_back_straight_max")]
    pub back_straight_max: f64,

    /// Which side of the body is measured
    #[serde(default)]
    pub side: BodySide,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FeedbackConfig {
    /// Where spoken feedback goes
    #[serde(default)]
    pub announcer: AnnouncerKind,

    /// Speech program used by the command announcer
    #[serde(default = "default_speech_command")]
    pub command: String,

    /// Extra arguments placed before the announced text
    #[serde(default)]
    pub command_args: Vec<String>,

    /// Announced when the subject drops into the squat
    #[serde(default = "default_descent_phrase")]
    pub descent_phrase: String,

    /// Announced once per back fault episode
    #[serde(default = "default_back_warning_phrase")]
    pub back_warning_phrase: String,

    /// Announced when the session starts
    #[serde(default = "default_startup_phrase")]
    pub startup_phrase: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RenderConfig {
    /// Log the status line and skeleton
    #[serde(default = "default_render_enabled")]
    pub enabled: bool,

    /// Keypoints are drawn above this score
    #[serde(default = "default_keypoint_threshold")]
    pub keypoint_threshold: f64,

    /// Skeleton edges are drawn when both ends exceed this score
    #[serde(default = "default_skeleton_threshold")]
    pub skeleton_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Optional file that receives a copy of the log output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BodySide {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncerKind {
    #[default]
    Log,
    Stdout,
    Command,
}

impl RepcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("repcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("source.input", default_source_input())?
            .set_default("source.fps", default_source_fps())?
            .set_default("source.drop_stale", default_drop_stale())?
            .set_default("analyzer.max_fps", default_analyzer_max_fps())?
            .set_default(
                "analyzer.confidence_threshold",
                default_confidence_threshold(),
            )?
            .set_default("analyzer.knee_up_angle", default_knee_up_angle())?
            .set_default("analyzer.knee_down_angle", default_knee_down_angle())?
            .set_default("analyzer.back_straight_min", default_back_straight_min())?
            .set_default("analyzer.back_straight_max", default_back_straight_max())?
            .set_default("analyzer.side", "left")?
            .set_default("feedback.announcer", "log")?
            .set_default("feedback.command", default_speech_command())?
            .set_default("feedback.command_args", Vec::<String>::new())?
            .set_default("feedback.descent_phrase", default_descent_phrase())?
            .set_default("feedback.back_warning_phrase", default_back_warning_phrase())?
            .set_default("feedback.startup_phrase", default_startup_phrase())?
            .set_default("render.enabled", default_render_enabled())?
            .set_default("render.keypoint_threshold", default_keypoint_threshold())?
            .set_default("render.skeleton_threshold", default_skeleton_threshold())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // REPCAM_ANALYZER__KNEE_UP_ANGLE=165 style overrides
            .add_source(
                Environment::with_prefix("REPCAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: RepcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let analyzer = &self.analyzer;

        if !(0.0..=1.0).contains(&analyzer.confidence_threshold) {
            return Err(ConfigError::Message(
                "Analyzer confidence_threshold must be within [0, 1]".to_string(),
            ));
        }

        if analyzer.knee_down_angle >= analyzer.knee_up_angle {
            return Err(ConfigError::Message(format!(
                "Analyzer knee_down_angle ({}) must be below knee_up_angle ({})",
                analyzer.knee_down_angle, analyzer.knee_up_angle
            )));
        }

        if analyzer.back_straight_min < 0.0
            || analyzer.back_straight_max > 180.0
            || analyzer.back_straight_min >= analyzer.back_straight_max
        {
            return Err(ConfigError::Message(
                "Analyzer back band must satisfy 0 <= back_straight_min < back_straight_max <= 180"
                    .to_string(),
            ));
        }

        if self.source.input.trim().is_empty() {
            return Err(ConfigError::Message(
                "Source input must be a path or \"-\"".to_string(),
            ));
        }

        if self.feedback.announcer == AnnouncerKind::Command
            && self.feedback.command.trim().is_empty()
        {
            return Err(ConfigError::Message(
                "Feedback command must be set when announcer = \"command\"".to_string(),
            ));
        }

        for threshold in [self.render.keypoint_threshold, self.render.skeleton_threshold] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::Message(
                    "Render thresholds must be within [0, 1]".to_string(),
                ));
            }
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as a TOML document
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for RepcamConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                input: default_source_input(),
                fps: default_source_fps(),
                drop_stale: default_drop_stale(),
            },
            analyzer: AnalyzerConfig::default(),
            feedback: FeedbackConfig {
                announcer: AnnouncerKind::default(),
                command: default_speech_command(),
                command_args: Vec::new(),
                descent_phrase: default_descent_phrase(),
                back_warning_phrase: default_back_warning_phrase(),
                startup_phrase: default_startup_phrase(),
            },
            render: RenderConfig {
                enabled: default_render_enabled(),
                keypoint_threshold: default_keypoint_threshold(),
                skeleton_threshold: default_skeleton_threshold(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                log_file: None,
            },
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_fps: default_analyzer_max_fps(),
            confidence_threshold: default_confidence_threshold(),
            knee_up_angle: default_knee_up_angle(),
            knee_down_angle: default_knee_down_angle(),
            back_straight_min: default_back_straight_min(),
            back_straight_max: default_back_straight_max(),
            side: BodySide::default(),
        }
    }
}

// Default value functions
fn default_source_input() -> String {
    "-".to_string()
}
fn default_source_fps() -> u32 {
    0
}
fn default_drop_stale() -> bool {
    false
}

fn default_analyzer_max_fps() -> u32 {
    0
}
fn default_confidence_threshold() -> f64 {
    0.3
}
fn default_knee_up_angle() -> f64 {
    160.0
}
fn default_knee_down_angle() -> f64 {
    100.0
}
fn default_back_straight_min() -> f64 {
    20.0
}
fn default_back_straight_max() -> f64 {
    160.0
}

fn default_speech_command() -> String {
    "espeak".to_string()
}
fn default_descent_phrase() -> String {
    "Up".to_string()
}
fn default_back_warning_phrase() -> String {
    "Keep your back straight".to_string()
}
fn default_startup_phrase() -> String {
    "Loading, please wait...".to_string()
}

fn default_render_enabled() -> bool {
    true
}
fn default_keypoint_threshold() -> f64 {
    0.3
}
fn default_skeleton_threshold() -> f64 {
    0.5
}

fn default_event_bus_capacity() -> usize {
    256
}
