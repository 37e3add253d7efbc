//! Utilities to report the progression of syncs and task changes

use std::fmt::{Display, Error, Formatter};

use chrono::{DateTime, Local};

/// Something that happened, that should be reported to the user
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    /// A listing has been requested to the server
    Connecting,
    /// Sync has successfully finished
    Synced{ at: DateTime<Local> },
    /// Something went wrong. The previous task list is still displayed
    Failed{ message: String },
}

impl Display for SyncEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SyncEvent::Connecting => write!(f, "Connecting..."),
            SyncEvent::Synced{at} => write!(f, "Last sync at {}", at.format("%H:%M")),
            SyncEvent::Failed{message} => write!(f, "{}", message),
        }
    }
}



/// How many events a slow listener may lag behind before missing some
const FEEDBACK_CAPACITY: usize = 64;

/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::broadcast::Sender<SyncEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::broadcast::Receiver<SyncEvent>;

/// Create a feedback channel. Every listener receives every event
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::broadcast::channel(FEEDBACK_CAPACITY)
}


/// A structure that tracks the errors that happen during an operation, and forwards them to the listeners (if any)
pub struct SyncProgress {
    n_errors: u32,
    feedback_channel: Option<FeedbackSender>
}
impl SyncProgress {
    pub fn new_with_feedback_channel(channel: FeedbackSender) -> Self {
        Self { n_errors: 0, feedback_channel: Some(channel) }
    }

    pub fn is_success(&self) -> bool {
        self.n_errors == 0
    }

    /// Log an error, and report it to the user
    pub fn error(&mut self, text: &str) {
        log::error!("{}", text);
        self.n_errors += 1;
        self.feedback(SyncEvent::Failed{ message: text.to_string() });
    }
    /// Log an info
    pub fn info(&mut self, text: &str) {
        log::info!("{}", text);
    }
    /// Log a debug message
    pub fn debug(&mut self, text: &str) {
        log::debug!("{}", text);
    }
    /// Send an event as a feedback to the listeners (if any).
    pub fn feedback(&mut self, event: SyncEvent) {
        if let Some(sender) = &self.feedback_channel {
            // Nobody listening is fine
            let _ = sender.send(event);
        }
    }
}
