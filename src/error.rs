//! Error types for the orchestration crate

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chat orchestration and task services
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the OpenAI API
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    /// The chat turn budget was exhausted before the terminating agent
    /// signalled completion
    #[error("Maximum turns exceeded: {max_turns}")]
    MaxTurnsExceeded { max_turns: usize },

    /// An agent kept issuing tool calls without ever producing a reply
    #[error("Agent '{agent}' exceeded {max_rounds} tool rounds in a single turn")]
    ToolRoundsExceeded { agent: String, max_rounds: usize },

    /// The model behaved in a way the orchestrator cannot interpret
    #[error("Model behavior error: {message}")]
    ModelBehavior { message: String },

    /// Caller-supplied input failed validation
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (template loading)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
