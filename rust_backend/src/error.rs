//! Planner error types.
//!
//! Rejections are not errors; they live on the entities. These types cover
//! infrastructure failures of collaborators and misuse of the planner API.

use crate::db::repository::RepositoryError;
use crate::oracles::OracleError;

/// Failure of any collaborator the planner calls during a cycle.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// A collaborator failed; the cycle was abandoned.
    #[error("Planning failed: {0}")]
    PlanningFailed(#[source] CollaboratorError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<CollaboratorError> for PlannerError {
    fn from(err: CollaboratorError) -> Self {
        PlannerError::PlanningFailed(err)
    }
}

impl From<RepositoryError> for PlannerError {
    fn from(err: RepositoryError) -> Self {
        PlannerError::PlanningFailed(CollaboratorError::Repository(err))
    }
}

impl From<OracleError> for PlannerError {
    fn from(err: OracleError) -> Self {
        PlannerError::PlanningFailed(CollaboratorError::Oracle(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_wrapping_keeps_cause() {
        let err: PlannerError = RepositoryError::ConnectionError("Database is not healthy".to_string()).into();
        assert!(matches!(
            err,
            PlannerError::PlanningFailed(CollaboratorError::Repository(RepositoryError::ConnectionError(_)))
        ));
        assert_eq!(err.to_string(), "Planning failed: Connection error: Database is not healthy");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_oracle_error_is_wrapped() {
        let err: PlannerError = OracleError::EphemerisUnavailable("no track".to_string()).into();
        assert!(matches!(err, PlannerError::PlanningFailed(CollaboratorError::Oracle(_))));
    }
}
