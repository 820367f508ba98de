pub mod audio;
pub mod browser;
pub mod clock;
pub mod llm;
#[cfg(feature = "microphone")]
pub mod microphone;
pub mod stt;
pub mod tts;

use crate::error::AdapterError;

pub use clock::{Clock, FixedClock, SystemClock};

/// Service trait for speech-to-text functionality.
/// Blocks until the recognizer reports a finished utterance.
pub trait SpeechCapture: Send {
    /// Capture one utterance; returns lowercase text, or an empty string on silence
    fn listen(&mut self) -> Result<String, AdapterError>;
}

/// Service trait for text-to-speech functionality (blocking)
pub trait SpeechOutput: Send {
    /// Speak the given text, returning once playback is done
    fn speak(&self, text: &str) -> Result<(), AdapterError>;
}

/// Service trait for language model completions (blocking)
pub trait LanguageModel: Send {
    /// Complete a prompt; the whole prompt is sent before any output is read
    fn complete(&self, prompt: &str) -> Result<String, AdapterError>;
}

/// Service trait for opening links in the user's browser
pub trait UrlOpener: Send {
    fn open(&self, url: &str) -> Result<(), AdapterError>;
}
