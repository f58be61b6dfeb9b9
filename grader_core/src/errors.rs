//! # Error Types
//!
//! Structured error types for grader_core. Errors fall into three groups that
//! callers must treat differently:
//!
//! - **Student input**: the submission is rejected and the student is told the
//!   values are outside the allowed range (`InvalidInput`, `GeometryOutOfBounds`).
//! - **Engine limitation**: the formula set does not cover the scenario
//!   (`UnsupportedCase`, `CompressedZoneCapacityExceeded`). The submission is
//!   rejected, but the message must not blame the student.
//! - **Server side**: reference data or storage problems (`ReferenceDataMissing`,
//!   `FileError`, ...). These are surfaced as errors, never as validation results.
//!
//! Missing upstream answers are *not* an error; calculators report them through
//! [`crate::calculations::CalcOutcome::Incomplete`].
//!
//! ## Example
//!
//! ```rust
//! use grader_core::errors::{GradeError, GradeResult, RejectionKind};
//!
//! fn check_height(height_cm: f64) -> GradeResult<()> {
//!     if height_cm > 80.0 {
//!         return Err(GradeError::geometry_out_of_bounds("girder_height", height_cm, 80.0));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_height(83.0).unwrap_err();
//! assert_eq!(err.rejection_kind(), Some(RejectionKind::StudentInput));
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for grader_core operations
pub type GradeResult<T> = Result<T, GradeError>;

/// Structured error type for grading operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum GradeError {
    /// An input value is invalid (out of configured range, malformed, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Derived geometry violates a hard code limit
    #[error("Geometry out of bounds: {field} = {value} exceeds limit {limit}")]
    GeometryOutOfBounds { field: String, value: f64, limit: f64 },

    /// The formula set does not cover this scenario
    #[error("Unsupported case in {calculation}: {reason}")]
    UnsupportedCase { calculation: String, reason: String },

    /// Relative compressed-zone depth exceeds the code limit
    #[error("Compressed zone capacity exceeded at {section}: alpha_m = {alpha_m:.4} > alpha_R = {alpha_r:.4}")]
    CompressedZoneCapacityExceeded {
        section: String,
        alpha_m: f64,
        alpha_r: f64,
    },

    /// Ground truth required for grading is not available
    #[error("Reference data missing: {entity} '{key}'")]
    ReferenceDataMissing { entity: String, key: String },

    /// A collaborator lookup found nothing
    #[error("Not found: {entity} '{key}'")]
    NotFound { entity: String, key: String },

    /// The stage is not unlocked for this student yet
    #[error("Stage '{stage}' is locked")]
    StageLocked { stage: String },

    /// Stage name does not match any known stage
    #[error("Unknown stage: {name}")]
    UnknownStage { name: String },

    /// Payload record does not belong to the named stage
    #[error("Payload for stage '{expected}' has shape of '{found}'")]
    PayloadMismatch { expected: String, found: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// How a rejected submission should be presented to the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionKind {
    /// The submitted values are outside the allowed range
    StudentInput,
    /// The grading engine cannot evaluate this scenario
    EngineLimitation,
}

impl GradeError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        GradeError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a GeometryOutOfBounds error
    pub fn geometry_out_of_bounds(field: impl Into<String>, value: f64, limit: f64) -> Self {
        GradeError::GeometryOutOfBounds {
            field: field.into(),
            value,
            limit,
        }
    }

    /// Create an UnsupportedCase error
    pub fn unsupported_case(calculation: impl Into<String>, reason: impl Into<String>) -> Self {
        GradeError::UnsupportedCase {
            calculation: calculation.into(),
            reason: reason.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(entity: impl Into<String>, key: impl ToString) -> Self {
        GradeError::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    /// Create a ReferenceDataMissing error
    pub fn reference_missing(entity: impl Into<String>, key: impl ToString) -> Self {
        GradeError::ReferenceDataMissing {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        GradeError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        GradeError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl ToString) -> Self {
        GradeError::SerializationError {
            reason: reason.to_string(),
        }
    }

    /// Turn a collaborator `NotFound` into the hard `ReferenceDataMissing` stop.
    ///
    /// Other variants pass through unchanged.
    pub fn into_reference_missing(self) -> Self {
        match self {
            GradeError::NotFound { entity, key } => GradeError::ReferenceDataMissing { entity, key },
            other => other,
        }
    }

    /// Classify the error for the student-facing rejection message.
    ///
    /// Returns `None` for server-side errors that must not be shown as a
    /// rejected submission.
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            GradeError::InvalidInput { .. } | GradeError::GeometryOutOfBounds { .. } => {
                Some(RejectionKind::StudentInput)
            }
            GradeError::UnsupportedCase { .. } | GradeError::CompressedZoneCapacityExceeded { .. } => {
                Some(RejectionKind::EngineLimitation)
            }
            _ => None,
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            GradeError::InvalidInput { .. } => "INVALID_INPUT",
            GradeError::GeometryOutOfBounds { .. } => "GEOMETRY_OUT_OF_BOUNDS",
            GradeError::UnsupportedCase { .. } => "UNSUPPORTED_CASE",
            GradeError::CompressedZoneCapacityExceeded { .. } => "COMPRESSED_ZONE_CAPACITY_EXCEEDED",
            GradeError::ReferenceDataMissing { .. } => "REFERENCE_DATA_MISSING",
            GradeError::NotFound { .. } => "NOT_FOUND",
            GradeError::StageLocked { .. } => "STAGE_LOCKED",
            GradeError::UnknownStage { .. } => "UNKNOWN_STAGE",
            GradeError::PayloadMismatch { .. } => "PAYLOAD_MISMATCH",
            GradeError::FileError { .. } => "FILE_ERROR",
            GradeError::FileLocked { .. } => "FILE_LOCKED",
            GradeError::SerializationError { .. } => "SERIALIZATION_ERROR",
            GradeError::VersionMismatch { .. } => "VERSION_MISMATCH",
            GradeError::Config { .. } => "CONFIG_ERROR",
            GradeError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = GradeError::geometry_out_of_bounds("girder_height", 83.0, 80.0);
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("GeometryOutOfBounds"));
        let roundtrip: GradeError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(GradeError::not_found("concrete", "B25").error_code(), "NOT_FOUND");
        assert_eq!(
            GradeError::unsupported_case("support reinforcement", "neutral axis in web").error_code(),
            "UNSUPPORTED_CASE"
        );
    }

    #[test]
    fn test_not_found_becomes_reference_missing() {
        let err = GradeError::not_found("variant assignment", "3/7").into_reference_missing();
        assert_eq!(err.error_code(), "REFERENCE_DATA_MISSING");

        let untouched = GradeError::invalid_input("x", "1", "bad").into_reference_missing();
        assert_eq!(untouched.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_rejection_kinds_are_distinct() {
        let student = GradeError::geometry_out_of_bounds("girder_height", 83.0, 80.0);
        let engine = GradeError::CompressedZoneCapacityExceeded {
            section: "left".to_string(),
            alpha_m: 0.45,
            alpha_r: 0.39,
        };
        let server = GradeError::reference_missing("concrete", "B25");
        let stored_shape = GradeError::PayloadMismatch {
            expected: "Concrete".to_string(),
            found: "BearingCapacity".to_string(),
        };

        assert_eq!(student.rejection_kind(), Some(RejectionKind::StudentInput));
        assert_eq!(engine.rejection_kind(), Some(RejectionKind::EngineLimitation));
        assert_eq!(server.rejection_kind(), None);
        assert_eq!(stored_shape.rejection_kind(), None);
    }
}
