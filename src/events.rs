use crate::analyzer::FrameAnalysis;
use crate::error::EventBusError;
use crate::feedback::FormCue;
use crate::pose::Pose;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Events that flow between the session's tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RepcamEvent {
    /// A new counting session began
    SessionStarted {
        session_id: Uuid,
        timestamp: SystemTime,
    },
    /// The analyzer finished a frame
    FrameAnalyzed {
        frame_id: u64,
        analysis: FrameAnalysis,
        pose: Option<Pose>,
        timestamp: SystemTime,
    },
    /// A squat repetition was completed
    RepCompleted { count: u32, timestamp: SystemTime },
    /// A coaching cue was raised
    FormCue { cue: FormCue, timestamp: SystemTime },
    /// No more events will follow for this session
    SessionEnded { reps: u32, timestamp: SystemTime },
}

impl RepcamEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            RepcamEvent::SessionStarted { session_id, .. } => {
                format!("Session {} started", session_id)
            }
            RepcamEvent::FrameAnalyzed {
                frame_id, analysis, ..
            } => {
                format!(
                    "Frame {} analyzed: {:?}, {} reps",
                    frame_id, analysis.posture, analysis.rep_count
                )
            }
            RepcamEvent::RepCompleted { count, .. } => format!("Repetition {} completed", count),
            RepcamEvent::FormCue { cue, .. } => format!("Form cue: {:?}", cue),
            RepcamEvent::SessionEnded { reps, .. } => {
                format!("Session ended with {} reps", reps)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            RepcamEvent::SessionStarted { .. } => "session_started",
            RepcamEvent::FrameAnalyzed { .. } => "frame_analyzed",
            RepcamEvent::RepCompleted { .. } => "rep_completed",
            RepcamEvent::FormCue { .. } => "form_cue",
            RepcamEvent::SessionEnded { .. } => "session_ended",
        }
    }
}

/// Event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<RepcamEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<RepcamEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter applied on receipt
    pub fn subscribe_filtered(&self, filter: EventFilter, name: &str) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.to_string())
    }

    /// Publish an event to all subscribers, returning how many received it
    pub fn publish(&self, event: RepcamEvent) -> Result<usize, EventBusError> {
        match &event {
            RepcamEvent::RepCompleted { count, .. } => {
                info!("Repetition {} completed", count);
            }
            _ => {
                trace!("Publishing event: {}", event.description());
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&RepcamEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &RepcamEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<RepcamEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<RepcamEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<RepcamEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<RepcamEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
