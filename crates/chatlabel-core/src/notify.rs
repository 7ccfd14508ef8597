//! Outgoing notifications
//!
//! The toast, the assertive live region and the audio cue are owned by the
//! host binding; the engine only calls this trait.

use crate::error::A11yError;

pub trait NotificationSink {
    /// Speak `text` through the assertive live region
    ///
    /// Implementations clear the region first so a repeated identical text is
    /// still spoken.
    fn announce(&mut self, text: &str);

    /// Short audible cue for a new message
    fn play_cue(&mut self) -> Result<(), A11yError>;

    /// Status toast: activated, deactivated, waiting, language changed
    fn notify(&mut self, text: &str);
}

/// Sink that records every call, for tests and headless runs
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingSink {
    pub announcements: Vec<String>,
    pub notices: Vec<String>,
    pub cues: usize,
    /// When set, `play_cue` fails with this message (still counted)
    pub cue_failure: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_cue(message: &str) -> Self {
        Self {
            cue_failure: Some(message.to_string()),
            ..Self::default()
        }
    }
}

impl NotificationSink for RecordingSink {
    fn announce(&mut self, text: &str) {
        self.announcements.push(text.to_string());
    }

    fn play_cue(&mut self) -> Result<(), A11yError> {
        self.cues += 1;
        match &self.cue_failure {
            Some(message) => Err(A11yError::Cue(message.clone())),
            None => Ok(()),
        }
    }

    fn notify(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }
}
