//! Error types.
//!
//! An unsatisfiable schedule is not an error; it is reported as
//! [`SchedulingOutcome::Unsatisfiable`](crate::models::SchedulingOutcome).
//! Errors are either rejected input or a failure to run the engine.

use std::fmt;

use thiserror::Error;

use crate::validation::ValidationError;

/// Failure to run the constraint engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("constraint engine unavailable: {0}")]
    Unavailable(String),

    #[error("constraint engine failed: {0}")]
    Execution(String),

    #[error("search limit reached after {nodes} nodes without a proven answer")]
    SearchLimit { nodes: u64 },

    #[error("constraint engine gave no answer: {0}")]
    Inconclusive(String),

    #[error("engine returned a malformed model: {0}")]
    MalformedModel(String),
}

/// All validation problems detected in one input snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// The individual errors.
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for (i, e) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}", e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

/// Errors returned by [`ScheduleSolver`](crate::solver::ScheduleSolver).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ScheduleError {
    /// Whether the input was rejected before reaching the engine.
    pub fn is_validation(&self) -> bool {
        matches!(self, ScheduleError::Invalid(_))
    }

    /// Validation errors, if this is an input rejection.
    pub fn validation_errors(&self) -> Option<&[ValidationError]> {
        match self {
            ScheduleError::Invalid(errors) => Some(errors.errors()),
            ScheduleError::Engine(_) => None,
        }
    }
}

/// Result alias for solver operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;
