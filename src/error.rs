use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("could not find {kind} with id `{id}`")]
    NotFound { kind: &'static str, id: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("no script evaluator registered for language `{0}`")]
    UnsupportedLanguage(String),
    #[error("script evaluation failed ({language}): {message}")]
    ScriptEvaluation { language: String, message: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("event listener `{listener}` failed: {message}")]
    Listener { listener: String, message: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidArgument(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        EngineError::Configuration(message.into())
    }

    /// Errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidArgument(_) | EngineError::NotFound { .. } | EngineError::Conflict(_)
        )
    }
}
