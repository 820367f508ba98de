use std::process::{Command, Stdio};

use crate::error::AdapterError;
use crate::services::SpeechOutput;

const ADAPTER: &str = "speech output";

/// Speech synthesis through a local engine such as `espeak-ng`.
/// The text is passed as the last argument and the call returns once the
/// engine has finished speaking.
#[derive(Debug, Clone)]
pub struct ProcessSpeechOutput {
    program: String,
    args: Vec<String>,
}

impl ProcessSpeechOutput {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn open(program: &str) -> Result<Self, AdapterError> {
        which::which(program)
            .map_err(|e| AdapterError::unavailable(ADAPTER, format!("'{}': {}", program, e)))?;
        log::info!("🔊 Speech output ready: {}", program);
        Ok(Self::new(program, Vec::new()))
    }
}

impl SpeechOutput for ProcessSpeechOutput {
    fn speak(&self, text: &str) -> Result<(), AdapterError> {
        if text.trim().is_empty() {
            log::debug!("Empty text, skipping TTS");
            return Ok(());
        }

        log::info!("🔊 Speaking: '{}'", text);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| AdapterError::from_spawn(ADAPTER, &self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdapterError::invocation(
                ADAPTER,
                format!("'{}' exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }
        Ok(())
    }
}

/// Used when speech output is switched off or the engine is missing
#[derive(Debug, Clone, Copy, Default)]
pub struct MutedSpeechOutput;

impl SpeechOutput for MutedSpeechOutput {
    fn speak(&self, text: &str) -> Result<(), AdapterError> {
        log::debug!("🔇 Speech muted, not speaking: '{}'", text);
        Ok(())
    }
}
