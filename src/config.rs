use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::intent::SiteDirectory;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid site entry '{entry}': {reason}")]
    InvalidSite { entry: String, reason: String },
    #[error("Invalid value for {option}: {reason}")]
    InvalidValue { option: String, reason: String },
    #[error("Argument error: {0}")]
    Args(#[from] clap::Error),
}

/// Command line arguments; every option can also come from the environment
/// or a `.env` file.
#[derive(Parser, Debug, Clone)]
#[command(version, about = "Offline voice and text assistant", long_about = None)]
pub struct Args {
    /// Language model executable
    #[arg(long, env = "ALFRED_LLM_COMMAND", default_value = "ollama")]
    pub llm_command: String,

    /// Model passed to `<llm-command> run <model>`
    #[arg(long, env = "ALFRED_LLM_MODEL", default_value = "llama3")]
    pub llm_model: String,

    /// Seconds to wait for a completion before giving up
    #[arg(long, env = "ALFRED_LLM_TIMEOUT_SECS", default_value_t = 120)]
    pub llm_timeout_secs: u64,

    /// Text-to-speech executable, called with the text as last argument (empty disables speech)
    #[arg(long, env = "ALFRED_TTS_COMMAND", default_value = "espeak-ng")]
    pub tts_command: String,

    /// Speech recognizer executable. Called as `<cmd> <model-dir>`, it reads raw
    /// 16kHz mono s16le PCM on stdin and prints one JSON object per line:
    /// `{"text": ...}` for final results, `{"partial": ...}` otherwise.
    /// `scripts/vosk-transcriber-stream` implements this on top of Vosk.
    #[arg(long, env = "ALFRED_STT_COMMAND", default_value = "vosk-transcriber-stream")]
    pub stt_command: String,

    /// Directory holding the speech recognition model
    #[arg(
        long,
        env = "ALFRED_STT_MODEL_DIR",
        default_value = "vosk-model-small-en-us-0.15"
    )]
    pub stt_model_dir: PathBuf,

    /// Program used to open URLs (defaults to the platform opener)
    #[arg(long, env = "ALFRED_BROWSER_COMMAND")]
    pub browser_command: Option<String>,

    /// Extra site shortcut as keyword=url, may be repeated
    #[arg(long = "site", value_name = "KEYWORD=URL")]
    pub sites: Vec<String>,

    /// Disable voice input
    #[arg(long)]
    pub no_voice: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub command: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    /// Arguments after the executable name
    pub fn args(&self) -> Vec<String> {
        vec!["run".to_string(), self.model.clone()]
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            command: "ollama".to_string(),
            model: "llama3".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    /// `None` when speech output is switched off
    pub tts_command: Option<String>,
    pub stt_command: String,
    pub stt_model_dir: PathBuf,
    pub voice_enabled: bool,
}

/// Fully resolved assistant configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub browser_command: Option<String>,
    pub sites: SiteDirectory,
}

impl AssistantConfig {
    /// Load configuration from `.env`, the environment and the command line
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        let args = Args::try_parse()?;
        Self::from_args(args)
    }

    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let llm_command = non_empty("--llm-command", &args.llm_command)?;
        let llm_model = non_empty("--llm-model", &args.llm_model)?;
        if args.llm_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                option: "--llm-timeout-secs".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        let mut sites = SiteDirectory::default();
        for entry in &args.sites {
            let (keyword, url) = parse_site(entry)?;
            sites.insert(keyword, url)?;
        }

        let tts_command = Some(args.tts_command.trim().to_string()).filter(|c| !c.is_empty());
        let browser_command = args
            .browser_command
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Self {
            llm: LlmConfig {
                command: llm_command,
                model: llm_model,
                timeout: Duration::from_secs(args.llm_timeout_secs),
            },
            speech: SpeechConfig {
                tts_command,
                stt_command: args.stt_command.trim().to_string(),
                stt_model_dir: args.stt_model_dir,
                voice_enabled: !args.no_voice,
            },
            browser_command,
            sites,
        })
    }
}

/// Split a `keyword=url` site argument
pub fn parse_site(entry: &str) -> Result<(&str, &str), ConfigError> {
    entry
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidSite {
            entry: entry.to_string(),
            reason: "expected KEYWORD=URL".to_string(),
        })
}

fn non_empty(option: &str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            option: option.to_string(),
            reason: "cannot be empty".to_string(),
        });
    }
    Ok(value.to_string())
}

/// Load configuration with helpful error messages
pub fn load_config() -> Result<AssistantConfig, ConfigError> {
    match AssistantConfig::load() {
        Ok(config) => {
            log::info!(
                "Loaded configuration: model '{}' via '{}', {} site shortcuts",
                config.llm.model,
                config.llm.command,
                config.sites.len()
            );
            Ok(config)
        }
        // clap renders its own usage errors
        Err(e @ ConfigError::Args(_)) => Err(e),
        Err(e) => {
            log::error!("Configuration error: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<AssistantConfig, ConfigError> {
        let mut argv = vec!["alfred"];
        argv.extend_from_slice(args);
        AssistantConfig::from_args(Args::try_parse_from(argv)?)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.llm.command, "ollama");
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.llm.args(), vec!["run", "llama3"]);
        assert_eq!(config.llm.timeout, Duration::from_secs(120));
        assert_eq!(config.speech.tts_command.as_deref(), Some("espeak-ng"));
        assert_eq!(
            config.speech.stt_model_dir,
            PathBuf::from("vosk-model-small-en-us-0.15")
        );
        assert!(config.speech.voice_enabled);
        assert_eq!(config.sites.len(), 6);
    }

    #[test]
    fn test_extra_sites() {
        let config = parse(&[
            "--site",
            "docs=https://docs.rs",
            "--site",
            "GitHub=https://github.com/trending",
        ])
        .unwrap();
        assert_eq!(config.sites.len(), 7);
        assert_eq!(config.sites.lookup("open docs"), Some("https://docs.rs"));
        assert_eq!(
            config.sites.lookup("open github"),
            Some("https://github.com/trending")
        );
    }

    #[test]
    fn test_bad_site_is_rejected() {
        assert!(matches!(
            parse(&["--site", "nourl"]),
            Err(ConfigError::InvalidSite { .. })
        ));
        assert!(matches!(
            parse(&["--site", "x=ftp://example.com"]),
            Err(ConfigError::InvalidSite { .. })
        ));
    }

    #[test]
    fn test_empty_tts_command_disables_speech() {
        let config = parse(&["--tts-command", ""]).unwrap();
        assert_eq!(config.speech.tts_command, None);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse(&["--llm-timeout-secs", "0"]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&["--llm-model", " "]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&["--llm-timeout-secs", "soon"]),
            Err(ConfigError::Args(_))
        ));
    }

    #[test]
    fn test_no_voice_flag() {
        let config = parse(&["--no-voice"]).unwrap();
        assert!(!config.speech.voice_enabled);
    }

    #[test]
    fn test_help_documents_recognizer_protocol() {
        use clap::CommandFactory;
        let help = Args::command().render_long_help().to_string();
        assert!(help.contains("s16le PCM on stdin"));
        assert!(help.contains("scripts/vosk-transcriber-stream"));
    }
}
