//! Engine error taxonomy.

use goaltrack_core::TimeError;
use goaltrack_storage::StorageError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, GoalError>;

/// Errors surfaced to callers of the goal engine.
#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    /// Missing field, unknown enum value, malformed date
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No such goal for the owner
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller lacks the capability for this owner
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Caller could not be identified
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Datastore failure
    #[error("internal error: {0}")]
    Internal(#[from] StorageError),
}

impl GoalError {
    /// Error code as exposed to remote callers.
    pub fn code(&self) -> &'static str {
        match self {
            GoalError::InvalidArgument(_) => "invalid-argument",
            GoalError::NotFound(_) => "not-found",
            GoalError::PermissionDenied(_) => "permission-denied",
            GoalError::Unauthenticated(_) => "unauthenticated",
            GoalError::Internal(_) => "internal",
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        GoalError::InvalidArgument(format!("missing required field '{}'", field))
    }
}

impl From<TimeError> for GoalError {
    fn from(e: TimeError) -> Self {
        GoalError::InvalidArgument(e.to_string())
    }
}
