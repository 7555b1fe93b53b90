use super::{Announcer, Phrases};
use crate::error::EventBusError;
use crate::events::{EventFilter, EventReceiver, RepcamEvent};

use std::sync::Arc;
use tracing::{debug, info, warn};

/// Event types the feedback task reacts to
pub const FEEDBACK_EVENTS: [&str; 4] = [
    "session_started",
    "rep_completed",
    "form_cue",
    "session_ended",
];

pub fn feedback_filter() -> EventFilter {
    EventFilter::EventTypes(FEEDBACK_EVENTS.to_vec())
}

/// Turns feedback events from the bus into announcements
pub struct FeedbackIntegration {
    phrases: Phrases,
    announcer: Arc<dyn Announcer>,
    receiver: EventReceiver,
}

impl FeedbackIntegration {
    /// `receiver` should use [`feedback_filter`] and be subscribed before the session publishes
    pub fn new(phrases: Phrases, announcer: Arc<dyn Announcer>, receiver: EventReceiver) -> Self {
        Self {
            phrases,
            announcer,
            receiver,
        }
    }

    /// Announce events until the session ends or the bus closes.
    /// Returns the number of announcements made.
    pub async fn run(mut self) -> u64 {
        info!(
            "Feedback task started (announcer: {})",
            self.announcer.name()
        );
        let mut announced = 0u64;

        loop {
            match self.receiver.recv().await {
                Ok(RepcamEvent::SessionEnded { reps, .. }) => {
                    debug!("Session ended with {} reps, stopping feedback", reps);
                    break;
                }
                Ok(event) => {
                    let Some(text) = self.phrases.phrase_for(&event) else {
                        continue;
                    };
                    match self.announcer.announce(&text).await {
                        Ok(()) => announced += 1,
                        Err(e) => warn!("Announcement '{}' failed: {}", text, e),
                    }
                }
                Err(EventBusError::Lagged { skipped }) => {
                    warn!("Feedback task missed {} events", skipped);
                }
                Err(e) => {
                    debug!("Feedback task stopping: {}", e);
                    break;
                }
            }
        }

        info!("Feedback task stopped after {} announcements", announced);
        announced
    }
}
