//! Error types for extraction specs and extraction runs.
//!
//! - [`SpecError`]: problems found in an [`ExtractionSpec`](super::spec::ExtractionSpec)
//!   before anything runs (bad values, unknown fields, missing policy)
//! - [`RunError`]: failures while an extractor processes a hierarchy
//!
//! Both carry a stable [`ErrorCode`], a JSON pointer `path` into the spec, a
//! human-readable `message`, and an optional `hint`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error_code::ErrorCode;
use crate::errors::ExtractionError;

// ─── Spec (build-time) errors ───────────────────────────────────────────────

/// A problem found in an extraction spec.
///
/// # Display format
///
/// ```text
/// [invalid_value] /policy/min_cluster_size: min_cluster_size must be >= 1
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] {path}: {message}")]
pub struct SpecError {
    pub code: ErrorCode,

    /// JSON pointer into the spec, e.g. `"/policy/threshold"`; `""` for the root.
    pub path: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl SpecError {
    pub fn new(code: ErrorCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a hint suggesting how to fix the problem.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ─── Run (execution-time) errors ────────────────────────────────────────────

/// A failure while running an extractor.
///
/// # Display format
///
/// ```text
/// [structural_inconsistency] /policy (extractor: hdbscan): no object is its own parent
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] {path} (extractor: {extractor}): {message}")]
pub struct RunError {
    pub code: ErrorCode,
    pub path: String,
    /// Name of the extractor that failed (e.g. `"cut_dendrogram"`)
    pub extractor: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl RunError {
    pub fn new(
        code: ErrorCode,
        path: impl Into<String>,
        extractor: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            path: path.into(),
            extractor: extractor.into(),
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Classify an [`ExtractionError`] raised by `extractor`.
    pub fn from_extraction(extractor: &str, err: ExtractionError) -> Self {
        match err {
            ExtractionError::StructuralInconsistency { message } => Self::new(
                ErrorCode::StructuralInconsistency,
                "",
                extractor,
                message,
            )
            .with_hint("The hierarchy producer must emit exactly one self-referencing root"),
            ExtractionError::InvalidConfig { message } => {
                Self::new(ErrorCode::InvalidValue, "/policy", extractor, message)
            }
            ExtractionError::Serialization { message } => {
                Self::new(ErrorCode::ExtractionFailed, "", extractor, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_error_display() {
        let err = SpecError::new(
            ErrorCode::InvalidValue,
            "/policy/min_clusters",
            "min_clusters must be >= 1",
        );
        assert_eq!(
            err.to_string(),
            "[invalid_value] /policy/min_clusters: min_clusters must be >= 1"
        );
    }

    #[test]
    fn test_spec_error_json_format() {
        let err = SpecError::new(ErrorCode::UnknownField, "/colour", "unrecognized field");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "unknown_field");
        assert_eq!(value["path"], "/colour");
        // hint is None, so it is absent
        assert!(value.get("hint").is_none());

        let with_hint = err.with_hint("remove it");
        let back: SpecError =
            serde_json::from_str(&serde_json::to_string(&with_hint).unwrap()).unwrap();
        assert_eq!(back, with_hint);
    }

    #[test]
    fn test_run_error_from_structural() {
        let err = RunError::from_extraction("hdbscan", ExtractionError::structural("two roots"));
        assert_eq!(err.code, ErrorCode::StructuralInconsistency);
        assert_eq!(err.extractor, "hdbscan");
        assert!(err.hint.is_some());
        assert_eq!(
            err.to_string(),
            "[structural_inconsistency]  (extractor: hdbscan): two roots"
        );
    }

    #[test]
    fn test_run_error_from_config() {
        let err = RunError::from_extraction(
            "simplified",
            ExtractionError::invalid_config("min_cluster_size must be >= 1"),
        );
        assert_eq!(err.code, ErrorCode::InvalidValue);
        assert_eq!(err.path, "/policy");
        let _: &dyn std::error::Error = &err;
    }
}
