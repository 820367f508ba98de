use std::io::{self, BufRead};
use std::thread;

use alfred::config::{load_config, AssistantConfig, ConfigError};
use alfred::frontend::Frontend;
use alfred::services::browser::SystemUrlOpener;
use alfred::services::llm::{ProcessLanguageModel, UnavailableLanguageModel};
use alfred::services::stt::{UnavailableSpeechCapture, VoiceCapture};
use alfred::services::tts::{MutedSpeechOutput, ProcessSpeechOutput};
use alfred::services::{LanguageModel, SpeechCapture, SpeechOutput, SystemClock};
use alfred::worker::{Job, TurnServices, TurnWorker};
use alfred::{AdapterError, Dispatcher, IntentClassifier, GREETING};
use anyhow::{Context, Result};

fn open_language_model(config: &AssistantConfig) -> Box<dyn LanguageModel> {
    match ProcessLanguageModel::open(&config.llm) {
        Ok(llm) => Box::new(llm),
        Err(e) => {
            log::error!("❌ {}; conversation is disabled", e);
            eprintln!("⚠️  {} (conversation disabled)", e);
            Box::new(UnavailableLanguageModel::new(e))
        }
    }
}

fn open_speech_output(config: &AssistantConfig) -> Box<dyn SpeechOutput> {
    let Some(program) = config.speech.tts_command.as_deref() else {
        log::info!("🔇 Speech output disabled");
        return Box::new(MutedSpeechOutput);
    };
    match ProcessSpeechOutput::open(program) {
        Ok(tts) => Box::new(tts),
        Err(e) => {
            log::error!("❌ {}; replies will not be spoken", e);
            eprintln!("⚠️  {} (replies will not be spoken)", e);
            Box::new(MutedSpeechOutput)
        }
    }
}

#[cfg(feature = "microphone")]
fn open_voice_capture(config: &AssistantConfig) -> Result<VoiceCapture, AdapterError> {
    use alfred::services::microphone::MicrophoneSource;
    use alfred::services::stt::ProcessRecognizer;

    let recognizer = ProcessRecognizer::open(
        &config.speech.stt_command,
        &[],
        &config.speech.stt_model_dir,
    )?;
    Ok(VoiceCapture::new(
        MicrophoneSource::factory(),
        Box::new(recognizer),
    ))
}

#[cfg(not(feature = "microphone"))]
fn open_voice_capture(_config: &AssistantConfig) -> Result<VoiceCapture, AdapterError> {
    Err(AdapterError::unavailable(
        "speech capture",
        "built without the `microphone` feature",
    ))
}

/// Returns the capture adapter and whether voice input is usable
fn open_speech_capture(config: &AssistantConfig) -> (Box<dyn SpeechCapture>, bool) {
    if !config.speech.voice_enabled {
        log::info!("🔇 Voice input disabled");
        let error = AdapterError::unavailable("speech capture", "disabled by configuration");
        return (Box::new(UnavailableSpeechCapture::new(error)), false);
    }
    match open_voice_capture(config) {
        Ok(capture) => (Box::new(capture), true),
        Err(e) => {
            log::error!("❌ {}; voice input is disabled", e);
            eprintln!("⚠️  {} (voice input disabled)", e);
            (Box::new(UnavailableSpeechCapture::new(e)), false)
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match load_config() {
        Ok(config) => config,
        // --help, --version and usage errors are reported by clap itself
        Err(ConfigError::Args(e)) => e.exit(),
        Err(e) => return Err(e).context("Failed to load configuration"),
    };
    log::info!("🚀 Starting Alfred");

    let dispatcher = Dispatcher::new(
        IntentClassifier::new(config.sites.clone()),
        open_language_model(&config),
        Box::new(SystemUrlOpener::with_program(
            config.browser_command.as_deref(),
        )),
        Box::new(SystemClock),
    );
    let speech_output = open_speech_output(&config);
    let (speech_capture, voice_enabled) = open_speech_capture(&config);

    let worker = TurnWorker::spawn(TurnServices {
        dispatcher,
        speech_output,
        speech_capture,
    })
    .context("Failed to start turn worker")?;
    worker
        .submit(Job::Announce(GREETING.to_string()))
        .context("Failed to greet")?;

    let (input_tx, input_rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("Failed to read input: {}", e);
                    break;
                }
            }
        }
    });

    println!("💬 Alfred is ready. Type a message, /listen to speak, /quit to exit.");
    let mut frontend = Frontend::new(io::stdout(), voice_enabled);
    let result = frontend.run(&worker, input_rx);

    worker.shutdown();
    result.context("Assistant stopped with an error")
}
