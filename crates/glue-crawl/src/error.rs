//! Error types for loading and running glue parsers.

/// Errors raised while turning a source program into a parser instance.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GlueError {
    /// Blank or otherwise unusable input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The source program does not compile. Never cached.
    #[error("Compile error at {line}:{column}: {message}")]
    Compile {
        line: usize,
        column: usize,
        message: String,
    },

    /// The compiled primary type does not implement the page parser capability.
    #[error("Type mismatch: cannot convert from instance[{type_name}] to PageParser")]
    TypeMismatch { type_name: String },
}

impl GlueError {
    pub(crate) fn compile(line: usize, column: usize, message: impl Into<String>) -> Self {
        GlueError::Compile {
            line,
            column,
            message: message.into(),
        }
    }

    /// Whether retrying with the same input can succeed.
    ///
    /// Compile errors are not cached, so a later call recompiles; the other
    /// variants are deterministic for a given input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GlueError::Compile { .. })
    }
}

/// Errors raised by record sinks.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sink closed: {0}")]
    Closed(String),
}

/// Convenience result type.
pub type GlueResult<T> = Result<T, GlueError>;
