use std::path::PathBuf;
use thiserror::Error;

/// The main error type for raillabel operations.
#[derive(Debug, Error)]
pub enum RaillabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema error in {path}: {}", .issues.join("; "))]
    Schema { path: PathBuf, issues: Vec<String> },

    #[error("Unsupported format in {path}: {message}")]
    UnsupportedFormat { path: PathBuf, message: String },

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Attribute '{attribute}' has unsupported type {found} (expected text, num, boolean or vec)")]
    UnsupportedAttributeType { attribute: String, found: String },

    #[error("Failed to write JSON to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RaillabelError {
    /// Creates a schema error with a single locator message.
    pub(crate) fn schema(path: impl Into<PathBuf>, issue: impl Into<String>) -> Self {
        RaillabelError::Schema {
            path: path.into(),
            issues: vec![issue.into()],
        }
    }

    /// Process exit code used by the CLI for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RaillabelError::Argument(_) => 2,
            RaillabelError::Parse { .. }
            | RaillabelError::Schema { .. }
            | RaillabelError::UnsupportedFormat { .. }
            | RaillabelError::UnsupportedAttributeType { .. } => 3,
            RaillabelError::Io(_) | RaillabelError::Write { .. } => 4,
        }
    }
}
