//! Speech capture: audio blocks from a source are fed to a recognizer until
//! it reports a finished utterance.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use serde::Deserialize;

use crate::error::AdapterError;
use crate::services::SpeechCapture;
use crate::types::AudioFormat;

const ADAPTER: &str = "speech capture";

/// Upper bound on a single capture, so a noisy room cannot hold the turn forever
pub const MAX_CAPTURE_DURATION: Duration = Duration::from_secs(15);

/// Provides blocks of 16-bit mono samples in the recognizer's format
pub trait AudioSource {
    /// Next block of exactly `block_size` samples, or `None` once the stream has ended
    fn read_block(&mut self) -> Result<Option<Vec<i16>>, AdapterError>;
}

/// Opens a fresh audio source for each capture. Sources are created and
/// dropped on the thread that listens, so they need not be `Send`.
pub type SourceFactory =
    Box<dyn FnMut(AudioFormat) -> Result<Box<dyn AudioSource>, AdapterError> + Send>;

/// Incremental speech recognizer
pub trait Recognizer: Send {
    /// Feed one block; returns the final text once the recognizer has one
    fn accept(&mut self, block: &[i16]) -> Result<Option<String>, AdapterError>;

    /// Prepare for a new capture. Audio left over from a capture that ended
    /// without a final result must not leak into the next transcript.
    fn reset(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// One JSON line emitted by the recognizer process; partial results use a
/// `"partial"` key and are not deserialized.
#[derive(Debug, Deserialize)]
struct RecognizerLine {
    text: Option<String>,
}

/// Parse a recognizer output line. Lines carrying `"text"` are final results;
/// partial results and anything unparseable yield `None`.
pub fn parse_result_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<RecognizerLine>(line) {
        Ok(parsed) => parsed.text,
        Err(e) => {
            log::debug!("Ignoring recognizer output '{}': {}", line, e);
            None
        }
    }
}

/// A running recognizer child with its stdin and result channel
struct RecognizerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    results: Receiver<String>,
}

impl RecognizerProcess {
    fn spawn(program: &str, args: &[String], model_dir: &Path) -> Result<Self, AdapterError> {
        let mut child = Command::new(program)
            .args(args)
            .arg(model_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AdapterError::from_spawn(ADAPTER, program, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::invocation(ADAPTER, "recognizer has no stdout"))?;
        let stdin = child.stdin.take();

        let (tx, results) = crossbeam_channel::unbounded();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("⚠️ Recognizer output error: {}", e);
                        break;
                    }
                };
                if let Some(text) = parse_result_line(&line) {
                    log::debug!("📝 Recognizer result: '{}'", text);
                    if tx.send(text).is_err() {
                        break;
                    }
                }
            }
            log::debug!("Recognizer output closed");
        });

        Ok(Self {
            child,
            stdin,
            results,
        })
    }
}

impl Drop for RecognizerProcess {
    fn drop(&mut self) {
        // Closing stdin lets a well-behaved recognizer exit on its own
        self.stdin.take();
        if let Err(e) = self.child.kill() {
            log::debug!("Recognizer already stopped: {}", e);
        }
        let _ = self.child.wait();
    }
}

/// Recognizer running as a child process (for example a Vosk helper).
///
/// The model directory is passed as the last argument. Raw s16le PCM goes to
/// stdin and JSON result lines come back on stdout. The helper keeps its own
/// audio buffer, so a capture that ends without a final result leaves the
/// child holding stale audio; `reset` restarts it in that case.
pub struct ProcessRecognizer {
    program: String,
    args: Vec<String>,
    model_dir: PathBuf,
    process: RecognizerProcess,
    /// Audio was written since the last final result
    unfinished: bool,
}

impl ProcessRecognizer {
    pub fn open(program: &str, args: &[String], model_dir: &Path) -> Result<Self, AdapterError> {
        if !model_dir.is_dir() {
            return Err(AdapterError::unavailable(
                ADAPTER,
                format!("recognition model not found at {}", model_dir.display()),
            ));
        }

        let process = RecognizerProcess::spawn(program, args, model_dir)?;
        log::info!(
            "🎤 Speech recognizer started: {} ({})",
            program,
            model_dir.display()
        );
        Ok(Self {
            program: program.to_string(),
            args: args.to_vec(),
            model_dir: model_dir.to_path_buf(),
            process,
            unfinished: false,
        })
    }

    fn restart(&mut self) -> Result<(), AdapterError> {
        log::info!("🔄 Restarting speech recognizer to drop unfinished audio");
        // The old child is stopped by Drop when replaced
        self.process = RecognizerProcess::spawn(&self.program, &self.args, &self.model_dir)?;
        self.unfinished = false;
        Ok(())
    }
}

impl Recognizer for ProcessRecognizer {
    fn accept(&mut self, block: &[i16]) -> Result<Option<String>, AdapterError> {
        let stdin = self
            .process
            .stdin
            .as_mut()
            .ok_or_else(|| AdapterError::invocation(ADAPTER, "recognizer input closed"))?;

        if !block.is_empty() {
            let bytes: Vec<u8> = block.iter().flat_map(|s| s.to_le_bytes()).collect();
            stdin
                .write_all(&bytes)
                .and_then(|_| stdin.flush())
                .map_err(|e| {
                    AdapterError::invocation(ADAPTER, format!("recognizer input: {}", e))
                })?;
            self.unfinished = true;
        }

        match self.process.results.try_recv() {
            Ok(text) => {
                self.unfinished = false;
                Ok(Some(text))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(AdapterError::invocation(
                ADAPTER,
                "recognizer process exited",
            )),
        }
    }

    fn reset(&mut self) -> Result<(), AdapterError> {
        let stale = self.process.results.try_iter().count();
        if stale > 0 {
            log::debug!("Discarded {} stale recognizer results", stale);
        }
        if self.unfinished {
            self.restart()?;
        }
        Ok(())
    }
}

/// Blocking capture loop combining an audio source with a recognizer
pub struct VoiceCapture {
    open_source: SourceFactory,
    recognizer: Box<dyn Recognizer>,
    format: AudioFormat,
    max_duration: Duration,
}

impl VoiceCapture {
    pub fn new(open_source: SourceFactory, recognizer: Box<dyn Recognizer>) -> Self {
        Self {
            open_source,
            recognizer,
            format: AudioFormat::default(),
            max_duration: MAX_CAPTURE_DURATION,
        }
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }
}

impl SpeechCapture for VoiceCapture {
    fn listen(&mut self) -> Result<String, AdapterError> {
        log::info!("👂 Listening for speech");
        self.recognizer.reset()?;
        let mut source = (self.open_source)(self.format)?;

        let started = Instant::now();
        let mut blocks = 0usize;
        while started.elapsed() < self.max_duration {
            let Some(block) = source.read_block()? else {
                log::info!("🔚 Audio stream ended after {} blocks", blocks);
                break;
            };
            blocks += 1;

            if let Some(text) = self.recognizer.accept(&block)? {
                let text = text.trim().to_lowercase();
                log::info!("✅ Transcript after {} blocks: '{}'", blocks, text);
                return Ok(text);
            }
        }

        if started.elapsed() >= self.max_duration {
            log::warn!("⏰ No final transcript within {:?}", self.max_duration);
        }
        Ok(String::new())
    }
}

/// Used when voice input is disabled or could not be set up
#[derive(Debug, Clone)]
pub struct UnavailableSpeechCapture {
    error: AdapterError,
}

impl UnavailableSpeechCapture {
    pub fn new(error: AdapterError) -> Self {
        Self { error }
    }
}

impl SpeechCapture for UnavailableSpeechCapture {
    fn listen(&mut self) -> Result<String, AdapterError> {
        Err(self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::VecDeque;

    struct ScriptedSource {
        blocks: VecDeque<Vec<i16>>,
    }

    impl AudioSource for ScriptedSource {
        fn read_block(&mut self) -> Result<Option<Vec<i16>>, AdapterError> {
            Ok(self.blocks.pop_front())
        }
    }

    fn source_factory(block_count: usize) -> SourceFactory {
        Box::new(
            move |format: AudioFormat| -> Result<Box<dyn AudioSource>, AdapterError> {
                let blocks = (0..block_count)
                    .map(|_| vec![0i16; format.block_size])
                    .collect();
                Ok(Box::new(ScriptedSource { blocks }))
            },
        )
    }

    /// Reports `text` after receiving `after` blocks
    struct CountingRecognizer {
        after: usize,
        seen: usize,
        text: String,
    }

    impl Recognizer for CountingRecognizer {
        fn accept(&mut self, block: &[i16]) -> Result<Option<String>, AdapterError> {
            assert_eq!(block.len(), AudioFormat::default().block_size);
            self.seen += 1;
            Ok((self.seen == self.after).then(|| self.text.clone()))
        }

        fn reset(&mut self) -> Result<(), AdapterError> {
            self.seen = 0;
            Ok(())
        }
    }

    #[test]
    fn test_parse_result_line() {
        assert_eq!(
            parse_result_line(r#"{"text": "open youtube"}"#),
            Some("open youtube".to_string())
        );
        assert_eq!(parse_result_line(r#"{"text": ""}"#), Some(String::new()));
        assert_eq!(parse_result_line(r#"{"partial": "open you"}"#), None);
        assert_eq!(parse_result_line("LOG (VoskAPI) loading model"), None);
        assert_eq!(parse_result_line(""), None);
    }

    #[test]
    fn test_listen_stops_at_first_final_result() {
        let recognizer = CountingRecognizer {
            after: 3,
            seen: 0,
            text: "  What Time Is It ".to_string(),
        };
        let mut capture = VoiceCapture::new(source_factory(10), Box::new(recognizer));
        assert_eq!(capture.listen().unwrap(), "what time is it");
        // Recognizer state is reset for the next capture
        assert_eq!(capture.listen().unwrap(), "what time is it");
    }

    #[test]
    fn test_listen_returns_empty_when_stream_ends() {
        let recognizer = CountingRecognizer {
            after: 100,
            seen: 0,
            text: "never".to_string(),
        };
        let mut capture = VoiceCapture::new(source_factory(5), Box::new(recognizer));
        assert_eq!(capture.listen().unwrap(), "");
    }

    #[test]
    fn test_listen_respects_max_duration() {
        let recognizer = CountingRecognizer {
            after: usize::MAX,
            seen: 0,
            text: String::new(),
        };
        let mut capture = VoiceCapture::new(source_factory(1000), Box::new(recognizer))
            .with_max_duration(Duration::ZERO);
        assert_eq!(capture.listen().unwrap(), "");
    }

    #[test]
    fn test_source_failure_propagates() {
        let factory: SourceFactory = Box::new(
            |_: AudioFormat| -> Result<Box<dyn AudioSource>, AdapterError> {
                Err(AdapterError::unavailable("microphone", "device busy"))
            },
        );
        let recognizer = CountingRecognizer {
            after: 1,
            seen: 0,
            text: "hi".to_string(),
        };
        let mut capture = VoiceCapture::new(factory, Box::new(recognizer));
        assert_eq!(
            capture.listen().unwrap_err().kind(),
            ErrorKind::AdapterUnavailable
        );
    }

    #[test]
    fn test_missing_model_dir_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("vosk-model-small-en-us-0.15");
        let err = match ProcessRecognizer::open("cat", &[], &missing) {
            Ok(_) => panic!("expected missing model to be reported"),
            Err(e) => e,
        };
        assert_eq!(err.kind(), ErrorKind::AdapterUnavailable);
        assert!(err.to_string().contains("recognition model not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_recognizer_reads_json_results() {
        let model_dir = tempfile::tempdir().unwrap();
        // Consume one block (8000 samples = 16000 bytes), report, then drain
        let script = r#"head -c 16000 > /dev/null
echo '{"partial": "hello"}'
echo '{"text": "Hello There"}'
cat > /dev/null"#;
        let mut recognizer = ProcessRecognizer::open(
            "sh",
            &["-c".to_string(), script.to_string()],
            model_dir.path(),
        )
        .unwrap();

        let block = vec![0i16; AudioFormat::default().block_size];
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut result = None;
        while result.is_none() && Instant::now() < deadline {
            result = recognizer.accept(&block).unwrap();
            if result.is_none() {
                thread::sleep(Duration::from_millis(10));
            }
        }
        assert_eq!(result.as_deref(), Some("Hello There"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unfinished_audio_does_not_reach_next_capture() {
        let model_dir = tempfile::tempdir().unwrap();
        // Finalizes only after three blocks (48000 bytes)
        let script = r#"head -c 48000 > /dev/null
echo '{"text": "open youtube"}'
cat > /dev/null"#;
        let mut recognizer = ProcessRecognizer::open(
            "sh",
            &["-c".to_string(), script.to_string()],
            model_dir.path(),
        )
        .unwrap();
        let block = vec![0i16; AudioFormat::default().block_size];

        // First capture ends after two blocks with nothing recognized
        recognizer.reset().unwrap();
        for _ in 0..2 {
            assert_eq!(recognizer.accept(&block).unwrap(), None);
        }

        // One more block in the next capture must not complete the old utterance
        recognizer.reset().unwrap();
        assert_eq!(recognizer.accept(&block).unwrap(), None);
        let quiet_until = Instant::now() + Duration::from_millis(500);
        while Instant::now() < quiet_until {
            assert_eq!(recognizer.accept(&[]).unwrap(), None);
            thread::sleep(Duration::from_millis(10));
        }

        // The restarted helper still works once it has its own three blocks
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut result = None;
        while result.is_none() && Instant::now() < deadline {
            result = recognizer.accept(&block).unwrap();
            if result.is_none() {
                thread::sleep(Duration::from_millis(10));
            }
        }
        assert_eq!(result.as_deref(), Some("open youtube"));
    }
}
