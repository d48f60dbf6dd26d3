use std::time::Duration;

use thiserror::Error;

use crate::problem::FlowProblem;
use crate::solution::Solution;

/// Narrow seam to the external multi-objective solver. Backends are
/// substitutable without touching the graph, flow or decomposition logic.
pub trait MultiObjectiveSolver {
    /// Solve one problem and return its Pareto set. An empty set is a
    /// genuine outcome (infeasible demand), not an error.
    fn solve(&self, problem: &FlowProblem) -> Result<Vec<Solution>, SolverError>;
}

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("failed to launch solver: {0}")]
    Launch(#[source] std::io::Error),

    #[error("solver exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("solver exceeded the {0:?} deadline")]
    Timeout(Duration),

    #[error("solver wrote no solution file at {0}")]
    MissingOutput(String),

    #[error("solution file line {line}: {message}")]
    MalformedOutput { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SolverError {
    /// Invocation-level failures worth one retry with identical inputs.
    /// A malformed solution file is not: the same inputs would reproduce it.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SolverError::Launch(_) | SolverError::Failed { .. } | SolverError::Timeout(_)
        )
    }
}
