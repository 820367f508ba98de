use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::AdapterError;
use crate::services::UrlOpener;

const ADAPTER: &str = "browser";

/// How long a launch may take to fail before it is assumed to have worked
const LAUNCH_GRACE: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Opens links with the desktop's URL handler
#[derive(Debug, Clone)]
pub struct SystemUrlOpener {
    program: String,
    args: Vec<String>,
    launch_grace: Duration,
}

impl SystemUrlOpener {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            launch_grace: LAUNCH_GRACE,
        }
    }

    pub fn with_launch_grace(mut self, launch_grace: Duration) -> Self {
        self.launch_grace = launch_grace;
        self
    }

    /// Use `program` if given, otherwise the platform default opener
    pub fn with_program(program: Option<&str>) -> Self {
        match program {
            Some(program) => Self::new(program, Vec::new()),
            None => Self::platform_default(),
        }
    }

    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("open", Vec::new())
        } else if cfg!(target_os = "windows") {
            // `cmd /C start` would split URLs at `&`
            Self::new(
                "rundll32",
                vec!["url.dll,FileProtocolHandler".to_string()],
            )
        } else {
            Self::new("xdg-open", Vec::new())
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl UrlOpener for SystemUrlOpener {
    fn open(&self, url: &str) -> Result<(), AdapterError> {
        log::info!("🌐 Opening {} with {}", url, self.program);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AdapterError::from_spawn(ADAPTER, &self.program, e))?;

        // Openers may run the browser in the foreground; only a quick failure counts
        let deadline = Instant::now() + self.launch_grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(AdapterError::invocation(
                        ADAPTER,
                        format!("'{}' exited with {} for {}", self.program, status, url),
                    ))
                }
                Ok(None) if Instant::now() >= deadline => break,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(AdapterError::invocation(
                        ADAPTER,
                        format!("failed to wait for '{}': {}", self.program, e),
                    ))
                }
            }
        }

        log::debug!("{} still running, leaving it in the background", self.program);
        let program = self.program.clone();
        thread::spawn(move || match child.wait() {
            Ok(status) => log::debug!("{} finished with {}", program, status),
            Err(e) => log::debug!("Failed to reap {}: {}", program, e),
        });
        Ok(())
    }
}
