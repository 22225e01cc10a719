use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanupError {
    /// A remote call failed. `code` is the remote service's error
    /// identifier; the retry policy matches on it.
    #[error("{code}: {message}")]
    Remote { code: String, message: String },

    #[error("no executions found for pipeline: {0}")]
    NoExecutions(String),

    #[error("cleanup workflow timed out")]
    Timeout,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CleanupError {
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The remote error identifier, if this is a remote failure.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Remote { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanupError>;
