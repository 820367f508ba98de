use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::LlmConfig;
use crate::error::AdapterError;
use crate::services::LanguageModel;

const ADAPTER: &str = "language model";

/// How often a running completion is checked for exit or timeout
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Language model reached through a local command line process.
///
/// Each completion is one request/response transaction: the prompt is
/// written to the child's stdin, stdin is closed, and stdout is collected
/// once the process exits.
#[derive(Debug, Clone)]
pub struct ProcessLanguageModel {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessLanguageModel {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Resolve the executable and build the adapter, failing if the binary
    /// cannot be found on `PATH`.
    pub fn open(config: &LlmConfig) -> Result<Self, AdapterError> {
        which::which(&config.command).map_err(|e| {
            AdapterError::unavailable(ADAPTER, format!("'{}': {}", config.command, e))
        })?;
        log::info!(
            "🧠 Language model ready: {} {}",
            config.command,
            config.args().join(" ")
        );
        Ok(Self::new(
            config.command.clone(),
            config.args(),
            config.timeout,
        ))
    }

    fn wait_with_timeout(
        &self,
        child: &mut std::process::Child,
    ) -> Result<ExitStatus, AdapterError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    log::warn!("⏰ Language model timed out after {:?}", self.timeout);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AdapterError::invocation(
                        ADAPTER,
                        format!("no response within {:?}", self.timeout),
                    ));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(AdapterError::invocation(
                        ADAPTER,
                        format!("failed to wait for '{}': {}", self.program, e),
                    ))
                }
            }
        }
    }
}

/// Drain a child pipe on its own thread so a chatty process never blocks on a full pipe
fn collect_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf) {
                log::debug!("Failed to read process output: {}", e);
            }
        }
        buf
    })
}

impl LanguageModel for ProcessLanguageModel {
    fn complete(&self, prompt: &str) -> Result<String, AdapterError> {
        log::info!("🤖 Sending prompt to language model ({} chars)", prompt.len());
        let started = Instant::now();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AdapterError::from_spawn(ADAPTER, &self.program, e))?;

        let stdout = collect_pipe(child.stdout.take());
        let stderr = collect_pipe(child.stderr.take());

        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_string();
            // Dropping stdin at the end of the thread closes it
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(prompt.as_bytes()) {
                    log::debug!("Language model closed stdin early: {}", e);
                }
            });
        }

        let status = self.wait_with_timeout(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            log::debug!("Language model stderr: {}", stderr.trim());
            return Err(AdapterError::invocation(
                ADAPTER,
                format!("'{}' exited with {}: {}", self.program, status, stderr.trim()),
            ));
        }

        let completion = String::from_utf8_lossy(&stdout).trim().to_string();
        log::info!(
            "🤖 Language model replied in {:.1}s ({} chars)",
            started.elapsed().as_secs_f32(),
            completion.len()
        );
        Ok(completion)
    }
}

/// Stand-in used when the configured language model could not be opened;
/// every completion reports the startup failure.
#[derive(Debug, Clone)]
pub struct UnavailableLanguageModel {
    error: AdapterError,
}

impl UnavailableLanguageModel {
    pub fn new(error: AdapterError) -> Self {
        Self { error }
    }
}

impl LanguageModel for UnavailableLanguageModel {
    fn complete(&self, _prompt: &str) -> Result<String, AdapterError> {
        Err(self.error.clone())
    }
}
