//! Error types for the bounded conversational pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Chunking error: {0}")]
    ChunkingError(String),

    #[error("Answer generation failed: {0}")]
    AnswerGeneration(#[from] AnswerGenerationError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure of the external answer function for a single chunk.
///
/// Recovered by the pipeline: the chunk contributes no answer and no history
/// turn, and the failure is handed back to the caller in the outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnswerGenerationError {
    #[error("remote model failure: {0}")]
    Remote(String),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("model call timed out: {0}")]
    Timeout(String),
}

impl From<PipelineError> for AnswerGenerationError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::AnswerGeneration(inner) => inner,
            PipelineError::HttpError(e) if e.is_timeout() => Self::Timeout(e.to_string()),
            PipelineError::SerializationError(e) => Self::MalformedOutput(e.to_string()),
            other => Self::Remote(other.to_string()),
        }
    }
}
