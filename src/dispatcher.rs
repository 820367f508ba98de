use crate::error::AdapterError;
use crate::intent::{Intent, IntentClassifier};
use crate::services::{Clock, LanguageModel, UrlOpener};
use crate::types::{Outcome, ResponseRecord, Turn, Utterance};

/// Spoken reply when a site is being opened
pub const OPENING_REPLY: &str = "Opening now";
/// Spoken reply when the browser could not be started
pub const OPEN_FAILED_REPLY: &str = "I couldn't open that link";
/// Reply when the language model could not produce an answer
pub const ASSISTANT_UNREACHABLE_REPLY: &str = "Sorry, I couldn't reach the assistant right now.";
/// Reply when the language model answered with nothing
pub const EMPTY_COMPLETION_REPLY: &str = "Sorry, I don't have an answer for that.";

/// Turns utterances into response records.
///
/// Classification is pure; the only side effect per turn is the single
/// adapter call the intent requires. Adapter failures never escape: they
/// become a fallback reply plus a `Degraded` outcome carrying the diagnostic.
pub struct Dispatcher {
    classifier: IntentClassifier,
    llm: Box<dyn LanguageModel>,
    opener: Box<dyn UrlOpener>,
    clock: Box<dyn Clock>,
}

impl Dispatcher {
    pub fn new(
        classifier: IntentClassifier,
        llm: Box<dyn LanguageModel>,
        opener: Box<dyn UrlOpener>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            classifier,
            llm,
            opener,
            clock,
        }
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Handle one utterance. Blank input produces no turn.
    pub fn dispatch(&self, utterance: &Utterance) -> Option<Turn> {
        if utterance.is_blank() {
            log::debug!("Ignoring blank {} input", utterance.source);
            return None;
        }

        let id = uuid::Uuid::new_v4();
        let utterance = Utterance {
            text: utterance.text.trim().to_string(),
            source: utterance.source,
        };
        let user = ResponseRecord::user(&utterance, self.clock.now());
        let intent = self.classifier.classify(&utterance);
        log::info!("🎯 Turn {}: {:?} from {} input", id, intent, utterance.source);

        let (reply, outcome) = match &intent {
            Intent::Time => self.tell_time(),
            Intent::OpenSite(url) => self.open_site(url),
            Intent::Converse => self.converse(&utterance.text),
        };

        if let Outcome::Degraded { kind, detail } = &outcome {
            log::warn!("⚠️ Turn {} degraded ({}): {}", id, kind, detail);
        }

        Some(Turn {
            id,
            intent,
            user,
            reply,
            outcome,
        })
    }

    fn tell_time(&self) -> (ResponseRecord, Outcome) {
        let now = self.clock.now();
        let text = format!("It is {}", now.format("%I:%M %p"));
        (ResponseRecord::assistant(text, now), Outcome::Replied)
    }

    fn open_site(&self, url: &str) -> (ResponseRecord, Outcome) {
        match self.opener.open(url) {
            Ok(()) => (
                ResponseRecord::assistant_with_display(
                    OPENING_REPLY,
                    format!("Opening {}", url),
                    self.clock.now(),
                ),
                Outcome::Replied,
            ),
            Err(e) => (
                ResponseRecord::assistant_with_display(
                    OPEN_FAILED_REPLY,
                    format!("I couldn't open {}", url),
                    self.clock.now(),
                ),
                degraded(e),
            ),
        }
    }

    fn converse(&self, prompt: &str) -> (ResponseRecord, Outcome) {
        match self.llm.complete(prompt) {
            Ok(completion) => {
                let completion = completion.trim();
                if completion.is_empty() {
                    log::warn!("Language model returned an empty completion");
                    (
                        ResponseRecord::assistant(EMPTY_COMPLETION_REPLY, self.clock.now()),
                        Outcome::Replied,
                    )
                } else {
                    (
                        ResponseRecord::assistant(completion, self.clock.now()),
                        Outcome::Replied,
                    )
                }
            }
            Err(e) => (
                ResponseRecord::assistant(ASSISTANT_UNREACHABLE_REPLY, self.clock.now()),
                degraded(e),
            ),
        }
    }
}

fn degraded(err: AdapterError) -> Outcome {
    Outcome::Degraded {
        kind: err.kind(),
        detail: err.to_string(),
    }
}
