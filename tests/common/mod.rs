//! Scripted adapters shared by the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alfred::services::{LanguageModel, SpeechCapture, SpeechOutput, UrlOpener};
use alfred::AdapterError;
use crossbeam_channel::Receiver;

/// Language model returning a fixed result and counting calls
#[derive(Clone)]
pub struct MockLanguageModel {
    pub calls: Arc<AtomicUsize>,
    pub prompts: Arc<Mutex<Vec<String>>>,
    reply: Result<String, AdapterError>,
    gate: Option<Receiver<()>>,
}

impl MockLanguageModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            reply: Ok(reply.to_string()),
            gate: None,
        }
    }

    pub fn failing(error: AdapterError) -> Self {
        Self {
            reply: Err(error),
            ..Self::replying("")
        }
    }

    /// Block each completion until a message arrives on `gate`
    pub fn gated(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LanguageModel for MockLanguageModel {
    fn complete(&self, prompt: &str) -> Result<String, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        self.reply.clone()
    }
}

#[derive(Clone)]
pub struct MockUrlOpener {
    pub opened: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MockUrlOpener {
    pub fn working() -> Self {
        Self {
            opened: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }
}

impl UrlOpener for MockUrlOpener {
    fn open(&self, url: &str) -> Result<(), AdapterError> {
        self.opened.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(AdapterError::unavailable("browser", "'xdg-open' not found"));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct MockSpeechOutput {
    pub spoken: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MockSpeechOutput {
    pub fn working() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechOutput for MockSpeechOutput {
    fn speak(&self, text: &str) -> Result<(), AdapterError> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(AdapterError::invocation(
                "speech output",
                "'espeak-ng' exited with exit status: 1",
            ));
        }
        Ok(())
    }
}

/// Returns scripted transcripts in order
pub struct MockSpeechCapture {
    results: VecDeque<Result<String, AdapterError>>,
}

impl MockSpeechCapture {
    pub fn new(results: Vec<Result<String, AdapterError>>) -> Self {
        Self {
            results: results.into(),
        }
    }
}

impl SpeechCapture for MockSpeechCapture {
    fn listen(&mut self) -> Result<String, AdapterError> {
        self.results.pop_front().unwrap_or_else(|| Ok(String::new()))
    }
}
