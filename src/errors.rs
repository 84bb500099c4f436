//! Error types for dendrocut
//!
//! Only a broken pointer hierarchy is a hard failure during extraction.
//! Unreachable targets are reported as warnings on the result instead.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Main error type for dendrocut
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// The pointer hierarchy is not a tree rooted at a single self-referencing
    /// object (missing or duplicate root, cycle, dangling parent pointer).
    /// The producer of the hierarchy is broken; extraction cannot continue.
    #[error("Structural inconsistency: {message}")]
    StructuralInconsistency { message: String },

    /// Configuration validation failed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl ExtractionError {
    /// Create a structural inconsistency error
    pub fn structural(message: impl Into<String>) -> Self {
        Self::StructuralInconsistency {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Check if this error means the input hierarchy itself is unusable
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::StructuralInconsistency { .. })
    }
}

impl From<serde_json::Error> for ExtractionError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractionError::structural("no root found");
        assert!(err.to_string().contains("Structural inconsistency"));
        assert!(err.to_string().contains("no root found"));

        let err = ExtractionError::invalid_config("min_cluster_size must be >= 1");
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_is_structural() {
        assert!(ExtractionError::structural("cycle").is_structural());
        assert!(!ExtractionError::invalid_config("bad").is_structural());
    }

    #[test]
    fn test_from_serde_json() {
        let err: ExtractionError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, ExtractionError::Serialization { .. }));
    }
}
