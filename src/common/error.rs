//! Error handling for schemapress

use crate::solver::SolverError;
use thiserror::Error;

/// Main error type for schemapress operations
#[derive(Error, Debug)]
pub enum SchemaPressError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No assignment satisfies the model. The verbatim fallback of every group
    /// makes this a modeling defect, never an input problem.
    #[error("Infeasible model: {0}")]
    InfeasibleModel(String),

    /// The time limit expired before any feasible assignment was found.
    #[error("Solver timeout: {0}")]
    SolverTimeout(String),

    /// A produced assignment renders two distinct values to the same token.
    #[error("Collision violation: {0}")]
    CollisionViolation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SchemaPressError {
    /// Invariant breaches are defects in the model builder, not runtime conditions
    pub fn is_invariant_breach(&self) -> bool {
        matches!(
            self,
            SchemaPressError::InfeasibleModel(_) | SchemaPressError::CollisionViolation(_)
        )
    }

    /// Short stable label used in benchmark records
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaPressError::Parse(_) => "parse",
            SchemaPressError::InvalidArgument(_) => "invalid_argument",
            SchemaPressError::InfeasibleModel(_) => "infeasible_model",
            SchemaPressError::SolverTimeout(_) => "solver_timeout",
            SchemaPressError::CollisionViolation(_) => "collision_violation",
            SchemaPressError::Internal(_) => "internal",
            SchemaPressError::Io(_) => "io",
            SchemaPressError::Serialization(_) => "serialization",
        }
    }
}

impl From<SolverError> for SchemaPressError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::InfeasibleModel(msg) => SchemaPressError::InfeasibleModel(msg),
            SolverError::NoSolution { elapsed, nodes } => SchemaPressError::SolverTimeout(format!(
                "no feasible assignment after {:.3}s ({} nodes)",
                elapsed.as_secs_f64(),
                nodes
            )),
            SolverError::InvalidModel(msg) => SchemaPressError::Internal(msg),
        }
    }
}

impl From<serde_json::Error> for SchemaPressError {
    fn from(err: serde_json::Error) -> Self {
        SchemaPressError::Serialization(err.to_string())
    }
}

impl From<sqlparser::parser::ParserError> for SchemaPressError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        SchemaPressError::Parse(err.to_string())
    }
}

/// Result type alias for schemapress operations
pub type SchemaPressResult<T> = std::result::Result<T, SchemaPressError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_err {
    ($msg:expr) => {
        $crate::common::error::SchemaPressError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::SchemaPressError::Internal(format!($fmt, $($arg)*))
    };
}

/// Macro for creating parse errors
#[macro_export]
macro_rules! parse_err {
    ($msg:expr) => {
        $crate::common::error::SchemaPressError::Parse($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::SchemaPressError::Parse(format!($fmt, $($arg)*))
    };
}
