//! Error types for the coach planner.

use thiserror::Error;

/// Errors that can occur while planning a week.
#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Assistant '{0}' not found")]
    TemplateNotFound(String),

    #[error("Missing assistants in '{dir}': {}", .names.join(", "))]
    MissingTemplates { dir: String, names: Vec<String> },

    #[error("Invalid assistant name: '{0}'")]
    InvalidTemplateName(String),

    #[error("Assistant '{assistant}' failed: {message}")]
    Generation { assistant: String, message: String },

    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoachError {
    pub fn generation(assistant: &str, message: impl Into<String>) -> Self {
        CoachError::Generation {
            assistant: assistant.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for coach operations.
pub type CoachResult<T> = Result<T, CoachError>;
