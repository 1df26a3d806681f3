use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("invalid rule #{index} ({field}): {message}")]
    RuleConfig {
        index: usize,
        field: &'static str,
        message: String,
    },
    #[error("{context}: {message}")]
    Collaborator {
        context: &'static str,
        message: String,
    },
}

impl EngineError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn rule_config(
        index: usize,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::RuleConfig {
            index,
            field,
            message: message.into(),
        }
    }

    /// Wraps a failure reported by an external model or service.
    pub fn collaborator(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Collaborator {
            context,
            message: err.to_string(),
        }
    }
}
