//! The library behind the `alfred` offline voice/text assistant.
//!
//! Input (typed or transcribed) is classified into an intent and answered
//! either by a built-in handler (current time, opening a website) or by a
//! local language model process. Speech recognition, speech synthesis, the
//! language model and the browser are external tools behind the traits in
//! [`services`].

pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod frontend;
pub mod intent;
pub mod services;
pub mod types;
pub mod worker;

// Re-export common types
pub use dispatcher::Dispatcher;
pub use error::{AdapterError, AssistantError, ErrorKind, Result};
pub use intent::{Intent, IntentClassifier, SiteDirectory};
pub use types::*;

/// Spoken and shown once at startup
pub const GREETING: &str = "Hello! I'm Alfred. Running completely offline.";
