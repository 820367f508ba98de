//! Runs turns off the presentation thread.
//!
//! A single worker thread owns the dispatcher and the speech adapters and
//! executes jobs one at a time. Results come back as [`WorkerEvent`]s over a
//! channel, so the presentation thread stays the only writer of the
//! conversation log. Only one job may be in flight: `submit` refuses new work
//! until the previous job has reported `Finished`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::dispatcher::Dispatcher;
use crate::error::{AssistantError, Result};
use crate::services::{SpeechCapture, SpeechOutput};
use crate::types::{Outcome, ResponseRecord, Utterance};

/// Said before voice capture starts
pub const LISTENING_PROMPT: &str = "Listening";
/// Notice when speech capture failed
pub const HEARING_FAILED_NOTICE: &str = "I couldn't hear that";
/// Notice when capture finished without any words
pub const NOTHING_HEARD_NOTICE: &str = "I didn't catch that";
/// Notice when speech output failed
pub const SPEAKING_FAILED_NOTICE: &str = "I couldn't speak that";

/// Work for the turn worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Dispatch a typed line
    Text(String),
    /// Capture speech and dispatch the transcript
    Listen,
    /// Show and speak an assistant message outside of a turn (greetings)
    Announce(String),
}

/// Messages from the worker to the presentation thread
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// A record to append to the conversation log
    Record(ResponseRecord),
    /// A transient status message that is shown but not logged
    Notice(String),
    /// The current job is complete and a new one may be submitted
    Finished { outcome: Option<Outcome> },
}

/// Everything the worker thread needs to run a turn
pub struct TurnServices {
    pub dispatcher: Dispatcher,
    pub speech_output: Box<dyn SpeechOutput>,
    pub speech_capture: Box<dyn SpeechCapture>,
}

pub struct TurnWorker {
    jobs: Option<Sender<Job>>,
    events: Receiver<WorkerEvent>,
    in_flight: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TurnWorker {
    pub fn spawn(services: TurnServices) -> Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (event_tx, events) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicBool::new(false));

        let worker_flag = Arc::clone(&in_flight);
        let handle = thread::Builder::new()
            .name("turn-worker".to_string())
            .spawn(move || {
                log::info!("🤖 Turn worker started");
                let mut runner = TurnRunner {
                    services,
                    events: event_tx,
                };
                for job in job_rx {
                    let outcome = runner.run(job);
                    // Clear before reporting so the next submit is accepted
                    worker_flag.store(false, Ordering::SeqCst);
                    if runner.emit(WorkerEvent::Finished { outcome }).is_err() {
                        break;
                    }
                }
                log::info!("🤖 Turn worker stopped");
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            events,
            in_flight,
            handle: Some(handle),
        })
    }

    /// Queue a job, failing with `Busy` while another job is running
    pub fn submit(&self, job: Job) -> Result<()> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AssistantError::Busy);
        }

        let sent = self
            .jobs
            .as_ref()
            .map(|jobs| jobs.send(job).is_ok())
            .unwrap_or(false);
        if !sent {
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(AssistantError::WorkerGone);
        }
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// Stop accepting jobs, let the current one finish and join the thread
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Turn worker panicked");
            }
        }
    }
}

impl Drop for TurnWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct TurnRunner {
    services: TurnServices,
    events: Sender<WorkerEvent>,
}

impl TurnRunner {
    fn emit(&self, event: WorkerEvent) -> std::result::Result<(), ()> {
        self.events.send(event).map_err(|_| {
            log::debug!("Presentation thread is gone, dropping event");
        })
    }

    fn run(&mut self, job: Job) -> Option<Outcome> {
        match job {
            Job::Text(text) => self.turn(Utterance::typed(text)),
            Job::Listen => self.listen_turn(),
            Job::Announce(text) => {
                let record = ResponseRecord::assistant(text.clone(), chrono::Local::now());
                let _ = self.emit(WorkerEvent::Record(record));
                self.speak(&text);
                None
            }
        }
    }

    fn listen_turn(&mut self) -> Option<Outcome> {
        self.speak(LISTENING_PROMPT);
        match self.services.speech_capture.listen() {
            Ok(text) if text.trim().is_empty() => {
                log::info!("🔇 Nothing heard");
                let _ = self.emit(WorkerEvent::Notice(NOTHING_HEARD_NOTICE.to_string()));
                None
            }
            Ok(text) => self.turn(Utterance::voice(text)),
            Err(e) => {
                log::warn!("⚠️ Speech capture failed ({}): {}", e.kind(), e);
                let _ = self.emit(WorkerEvent::Notice(HEARING_FAILED_NOTICE.to_string()));
                None
            }
        }
    }

    fn turn(&mut self, utterance: Utterance) -> Option<Outcome> {
        let turn = self.services.dispatcher.dispatch(&utterance)?;
        for record in turn.records() {
            let _ = self.emit(WorkerEvent::Record(record.clone()));
        }
        self.speak(&turn.reply.spoken_text);
        Some(turn.outcome)
    }

    fn speak(&self, text: &str) {
        if let Err(e) = self.services.speech_output.speak(text) {
            log::warn!("⚠️ Speech output failed ({}): {}", e.kind(), e);
            let _ = self.emit(WorkerEvent::Notice(SPEAKING_FAILED_NOTICE.to_string()));
        }
    }
}
