//! Error types for job execution.

use glue_crawl::GlueError;

/// Errors raised by crawl jobs and their building blocks.
#[derive(thiserror::Error, Debug)]
pub enum ExecutorError {
    /// Parser loading failed: blank source, compile error or wrong type.
    #[error(transparent)]
    Glue(#[from] GlueError),

    #[error("Invalid job parameter: {0}")]
    InvalidParameter(String),

    /// A click-path step failed; the remaining steps were not run.
    #[error("Click step {step} on \"{selector}\" failed: {message}")]
    Interaction {
        step: usize,
        selector: String,
        message: String,
    },

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExecutorError {
    /// Whether the job failed before any page was requested.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExecutorError::Glue(_) | ExecutorError::InvalidParameter(_)
        )
    }
}

/// Convenience result type.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
