use fxhash::FxHashMap;

use ecoroute_flow::flow::Flow;
use ecoroute_flow::problem::{FlowProblem, ProblemArc};
use ecoroute_flow::solution::Solution;
use ecoroute_flow::solver::SolverError;

/// Parse the solver's solution file: one Pareto point per line, a bracketed
/// objective vector followed by `L<arc>=<value>` assignments. Values may be
/// float-spelled integers; they are truncated toward zero. An empty file is
/// a genuine zero-solution outcome, not a parse failure.
pub fn parse_solutions(text: &str, problem: &FlowProblem) -> Result<Vec<Solution>, SolverError> {
    let arcs: FxHashMap<&str, &ProblemArc> =
        problem.arcs().iter().map(|arc| (arc.id(), arc)).collect();

    let mut solutions = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let rest = raw
            .strip_prefix('[')
            .ok_or_else(|| SolverError::MalformedOutput {
                line,
                message: "expected a bracketed objective vector".to_string(),
            })?;
        let (objectives, assignments) =
            rest.split_once(']')
                .ok_or_else(|| SolverError::MalformedOutput {
                    line,
                    message: "unterminated objective vector".to_string(),
                })?;

        let objectives = objectives
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map(|value| value.round() as i64)
                    .map_err(|_| SolverError::MalformedOutput {
                        line,
                        message: format!("not an objective value: {token}"),
                    })
            })
            .collect::<Result<Vec<i64>, SolverError>>()?;

        let mut flow = Flow::new();
        for token in assignments.split_whitespace() {
            let (column, value) =
                token
                    .split_once('=')
                    .ok_or_else(|| SolverError::MalformedOutput {
                        line,
                        message: format!("expected arc=value, found {token}"),
                    })?;
            let id = column.strip_prefix('L').unwrap_or(column);
            let arc = arcs.get(id).ok_or_else(|| SolverError::MalformedOutput {
                line,
                message: format!("unknown arc column {column}"),
            })?;
            let value: f64 = value.parse().map_err(|_| SolverError::MalformedOutput {
                line,
                message: format!("not an integer assignment: {token}"),
            })?;
            let units = value.trunc() as i64;
            if units < 0 {
                return Err(SolverError::MalformedOutput {
                    line,
                    message: format!("negative flow on arc {id}: {value}"),
                });
            }
            if units > 0 {
                flow.add_units(arc.from(), arc.to(), units as u64);
            }
        }
        solutions.push(Solution::new(objectives, flow));
    }
    Ok(solutions)
}
