//! # Sync Error Types
//!
//! Errors raised to callers of the synchronization engine.
//!
//! Stale ids inside reports are NOT errors. The decoder and the report
//! handlers skip them; only calls made by the controller itself can fail
//! with [`SyncError::UnknownEntity`].

use crate::report::ReportError;
use physbridge_shared::{ConstraintType, EntityId};
use thiserror::Error;

/// Errors that can occur while driving a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A constraint type that needs two bodies was given one.
    #[error("{kind} constraint requires a second body")]
    MissingSecondBody {
        /// Constraint type being constructed.
        kind: ConstraintType,
    },

    /// A hinge or slider was constructed without an axis.
    #[error("{kind} constraint requires an axis")]
    MissingAxis {
        /// Constraint type being constructed.
        kind: ConstraintType,
    },

    /// The id is not registered with this scene.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// A per-type configuration command targets a constraint of another type.
    #[error("constraint {id} is a {actual} constraint, not {expected}")]
    ConstraintKindMismatch {
        /// Constraint id.
        id: EntityId,
        /// Type the command is for.
        expected: ConstraintType,
        /// Type of the constraint.
        actual: ConstraintType,
    },

    /// An inbound report could not be decoded.
    #[error("malformed report: {0}")]
    MalformedReport(#[from] ReportError),

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A command or control message failed to (de)serialize.
    #[error("encoding failed: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

/// Result type for scene operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_constraint_type() {
        let err = SyncError::MissingSecondBody { kind: ConstraintType::ConeTwist };
        assert_eq!(err.to_string(), "conetwist constraint requires a second body");

        let err = SyncError::ConstraintKindMismatch {
            id: EntityId::from_raw(4),
            expected: ConstraintType::Hinge,
            actual: ConstraintType::Slider,
        };
        assert_eq!(err.to_string(), "constraint #4 is a slider constraint, not hinge");
    }

    #[test]
    fn test_report_errors_convert() {
        let err: SyncError = ReportError::Empty.into();
        assert!(matches!(err, SyncError::MalformedReport(ReportError::Empty)));
    }
}
