//! Error types for repository operations.

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<String> for RepositoryError {
    fn from(s: String) -> Self {
        RepositoryError::InternalError(s)
    }
}

impl From<&str> for RepositoryError {
    fn from(s: &str) -> Self {
        RepositoryError::InternalError(s.to_string())
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for RepositoryError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        RepositoryError::ValidationError(format!("Invalid project data at '{}': {}", err.path(), err.inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RepositoryError::NotFound("Target 3 not found".to_string());
        assert_eq!(err.to_string(), "Not found: Target 3 not found");
        let err: RepositoryError = "boom".into();
        assert!(matches!(err, RepositoryError::InternalError(_)));
    }
}
