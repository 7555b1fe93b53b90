mod announcer;
mod integration;

pub use announcer::{
    announcer_from_config, Announcer, CommandAnnouncer, LogAnnouncer, StdoutAnnouncer,
};
pub use integration::{feedback_filter, FeedbackIntegration, FEEDBACK_EVENTS};

use crate::config::FeedbackConfig;
use crate::events::RepcamEvent;
use serde::{Deserialize, Serialize};

/// Coaching cues raised by the analyzer on posture transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormCue {
    /// The subject dropped from standing into the squat
    Descending,
    /// Torso and thigh stopped forming a straight line
    StraightenBack,
}

/// Callback interface the analyzer reports through
pub trait FeedbackSink {
    /// A repetition finished; `count` is the new total
    fn on_rep_counted(&mut self, count: u32);

    fn on_form_cue(&mut self, cue: FormCue);
}

/// A single feedback callback, captured for later dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    RepCounted(u32),
    Cue(FormCue),
}

impl FeedbackSink for Vec<Feedback> {
    fn on_rep_counted(&mut self, count: u32) {
        self.push(Feedback::RepCounted(count));
    }

    fn on_form_cue(&mut self, cue: FormCue) {
        self.push(Feedback::Cue(cue));
    }
}

/// Text spoken for each feedback event
#[derive(Debug, Clone)]
pub struct Phrases {
    pub descent: String,
    pub back_warning: String,
    pub startup: String,
}

impl Phrases {
    pub fn from_config(config: &FeedbackConfig) -> Self {
        Self {
            descent: config.descent_phrase.clone(),
            back_warning: config.back_warning_phrase.clone(),
            startup: config.startup_phrase.clone(),
        }
    }

    pub fn for_cue(&self, cue: FormCue) -> &str {
        match cue {
            FormCue::Descending => &self.descent,
            FormCue::StraightenBack => &self.back_warning,
        }
    }

    /// The announcement for an event, if it is one that gets spoken
    pub fn phrase_for(&self, event: &RepcamEvent) -> Option<String> {
        match event {
            RepcamEvent::SessionStarted { .. } => Some(self.startup.clone()),
            RepcamEvent::RepCompleted { count, .. } => Some(count.to_string()),
            RepcamEvent::FormCue { cue, .. } => Some(self.for_cue(*cue).to_string()),
            _ => None,
        }
    }
}
