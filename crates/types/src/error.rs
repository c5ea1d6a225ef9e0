//! Error types for the configuration resolver

use std::path::PathBuf;
use thiserror::Error;

/// Configuration specific errors
///
/// Missing environment variables never produce one of these; they resolve
/// to empty or default values instead.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Override file exists but could not be read or parsed
    #[error("Invalid override file {}: {message}", path.display())]
    InvalidOverride { path: PathBuf, message: String },

    /// Serialization of the resolved configuration failed
    #[error("Configuration serialization error: {0}")]
    Serialization(String),

    /// Validation error
    #[error("Configuration validation error: {field}: {message}")]
    ValidationError { field: String, message: String },
}

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_override_message_names_file() {
        let err = ConfigError::InvalidOverride {
            path: PathBuf::from("/app/pythonpath/superset_config_docker.yaml"),
            message: "unknown field `FOO`".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("/app/pythonpath/superset_config_docker.yaml"));
        assert!(text.contains("unknown field `FOO`"));
    }
}
