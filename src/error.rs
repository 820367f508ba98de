use crate::config::ConfigError;
use thiserror::Error;

/// Coarse classification of adapter failures, used by presentation to decide
/// what is shown to the user and what only goes to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    /// The external tool cannot be used at all (binary missing, model missing, no device)
    #[strum(serialize = "adapter unavailable")]
    AdapterUnavailable,
    /// The external tool was reached but the call failed
    #[strum(serialize = "adapter invocation failure")]
    AdapterInvocationFailure,
}

/// Failure at an external boundary (language model, speech, browser)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("{adapter} unavailable: {reason}")]
    Unavailable {
        adapter: &'static str,
        reason: String,
    },

    #[error("{adapter} failed: {reason}")]
    Invocation {
        adapter: &'static str,
        reason: String,
    },
}

impl AdapterError {
    pub fn unavailable(adapter: &'static str, reason: impl Into<String>) -> Self {
        AdapterError::Unavailable {
            adapter,
            reason: reason.into(),
        }
    }

    pub fn invocation(adapter: &'static str, reason: impl Into<String>) -> Self {
        AdapterError::Invocation {
            adapter,
            reason: reason.into(),
        }
    }

    /// Map a failed spawn to the right variant: a missing binary makes the
    /// adapter unavailable, anything else is a failed invocation.
    pub fn from_spawn(adapter: &'static str, program: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            AdapterError::unavailable(adapter, format!("'{}' not found", program))
        } else {
            AdapterError::invocation(adapter, format!("failed to run '{}': {}", program, err))
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::Unavailable { .. } => ErrorKind::AdapterUnavailable,
            AdapterError::Invocation { .. } => ErrorKind::AdapterInvocationFailure,
        }
    }
}

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("A turn is already in progress")]
    Busy,

    #[error("Turn worker has stopped")]
    WorkerGone,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_not_found_is_unavailable() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let adapter_err = AdapterError::from_spawn("language model", "ollama", err);
        assert_eq!(adapter_err.kind(), ErrorKind::AdapterUnavailable);
        assert_eq!(
            adapter_err.to_string(),
            "language model unavailable: 'ollama' not found"
        );
    }

    #[test]
    fn test_spawn_other_error_is_invocation_failure() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let adapter_err = AdapterError::from_spawn("speech output", "espeak-ng", err);
        assert_eq!(adapter_err.kind(), ErrorKind::AdapterInvocationFailure);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(
            ErrorKind::AdapterUnavailable.to_string(),
            "adapter unavailable"
        );
        assert_eq!(
            ErrorKind::AdapterInvocationFailure.to_string(),
            "adapter invocation failure"
        );
    }
}
