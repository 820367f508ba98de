use chrono::{DateTime, Local};

use crate::error::ErrorKind;
use crate::intent::Intent;

/// Where an utterance came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Source {
    #[strum(serialize = "typed")]
    Typed,
    #[strum(serialize = "voice")]
    Voice,
}

/// One unit of user input, typed or transcribed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub source: Source,
}

impl Utterance {
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: Source::Typed,
        }
    }

    pub fn voice(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: Source::Voice,
        }
    }

    /// True when there is nothing to dispatch
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Author of a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Sender {
    #[strum(serialize = "You")]
    User,
    #[strum(serialize = "Alfred")]
    Assistant,
}

/// A single entry for presentation and speech output
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub spoken_text: String,
    pub display_text: String,
    pub sender: Sender,
    /// Input channel for user records; `None` for assistant records
    pub source: Option<Source>,
    pub timestamp: DateTime<Local>,
}

impl ResponseRecord {
    /// Echo of what the user said or typed
    pub fn user(utterance: &Utterance, timestamp: DateTime<Local>) -> Self {
        Self {
            spoken_text: utterance.text.clone(),
            display_text: utterance.text.clone(),
            sender: Sender::User,
            source: Some(utterance.source),
            timestamp,
        }
    }

    /// Assistant reply where the same text is spoken and shown
    pub fn assistant(text: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        let text = text.into();
        Self::assistant_with_display(text.clone(), text, timestamp)
    }

    pub fn assistant_with_display(
        spoken_text: impl Into<String>,
        display_text: impl Into<String>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            spoken_text: spoken_text.into(),
            display_text: display_text.into(),
            sender: Sender::Assistant,
            source: None,
            timestamp,
        }
    }

    /// Label shown next to the timestamp, e.g. "You (voice)"
    pub fn label(&self) -> String {
        match (self.sender, self.source) {
            (Sender::User, Some(Source::Voice)) => format!("{} (voice)", self.sender),
            (sender, _) => sender.to_string(),
        }
    }
}

/// How the assistant's reply came about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Replied,
    /// An adapter failed; the reply is a user-facing fallback and `detail`
    /// holds the diagnostic for the log.
    Degraded { kind: ErrorKind, detail: String },
}

impl Outcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }
}

/// Result of dispatching one utterance
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: uuid::Uuid,
    pub intent: Intent,
    pub user: ResponseRecord,
    pub reply: ResponseRecord,
    pub outcome: Outcome,
}

impl Turn {
    /// Records in display order: the user echo, then the reply
    pub fn records(&self) -> [&ResponseRecord; 2] {
        [&self.user, &self.reply]
    }
}

/// Audio format expected by the speech recognition backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples handed to the recognizer per block
    pub block_size: usize,
}

impl AudioFormat {
    /// Duration of one block in milliseconds
    pub fn block_duration_ms(&self) -> u64 {
        self.block_size as u64 * 1000 / self.sample_rate as u64
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz, what the recognition models are trained on
            channels: 1,        // Mono
            block_size: 8000,   // 500ms at 16kHz
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_utterance() {
        assert!(Utterance::typed("").is_blank());
        assert!(Utterance::voice("   \t").is_blank());
        assert!(!Utterance::typed("hi").is_blank());
    }

    #[test]
    fn test_record_labels() {
        let now = Local::now();
        assert_eq!(
            ResponseRecord::user(&Utterance::typed("hi"), now).label(),
            "You"
        );
        assert_eq!(
            ResponseRecord::user(&Utterance::voice("hi"), now).label(),
            "You (voice)"
        );
        assert_eq!(ResponseRecord::assistant("hello", now).label(), "Alfred");
    }

    #[test]
    fn test_audio_format_defaults() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 16000);
        assert_eq!(format.channels, 1);
        assert_eq!(format.block_size, 8000);
        assert_eq!(format.block_duration_ms(), 500);
    }
}
