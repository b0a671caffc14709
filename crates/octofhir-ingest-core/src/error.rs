use thiserror::Error;

/// Errors produced while planning an ingestion run
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Cyclic dependency between resource types: {}", .types.join(", "))]
    CyclicDependency { types: Vec<String> },

    #[error("Invalid manifest base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl IngestError {
    /// Create a new CyclicDependency error. Types are sorted so the message is stable.
    pub fn cyclic_dependency<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut types: Vec<String> = types.into_iter().map(Into::into).collect();
        types.sort();
        Self::CyclicDependency { types }
    }

    /// Create a new InvalidBaseUrl error
    pub fn invalid_base_url(url: impl Into<String>) -> Self {
        Self::InvalidBaseUrl(url.into())
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CyclicDependency { .. } => ErrorCategory::Planning,
            Self::InvalidBaseUrl(_) => ErrorCategory::Configuration,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for log classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Planning,
    Configuration,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Configuration => write!(f, "configuration"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for planning operations
pub type Result<T> = std::result::Result<T, IngestError>;
