//! Stable error codes shared by spec validation and extraction runs.
//!
//! Codes serialize as `snake_case` strings and never change meaning once
//! released, so callers can match on them programmatically.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The document is not valid JSON or does not match the schema.
    MalformedSpec,
    /// The `v` field names a version this crate does not understand.
    UnsupportedVersion,
    /// No extraction policy was selected.
    MissingPolicy,
    /// A numeric parameter is out of range.
    InvalidValue,
    /// Options that have no effect together with the selected policy.
    InvalidCombo,
    /// A field not recognized by the schema.
    UnknownField,
    /// Summary code for a spec rejected by validation.
    ValidationFailed,
    /// The pointer hierarchy is not a single rooted tree.
    StructuralInconsistency,
    /// Any other failure while running an extraction.
    ExtractionFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedSpec => "malformed_spec",
            Self::UnsupportedVersion => "unsupported_version",
            Self::MissingPolicy => "missing_policy",
            Self::InvalidValue => "invalid_value",
            Self::InvalidCombo => "invalid_combo",
            Self::UnknownField => "unknown_field",
            Self::ValidationFailed => "validation_failed",
            Self::StructuralInconsistency => "structural_inconsistency",
            Self::ExtractionFailed => "extraction_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
