use fxhash::FxHashMap;

use ecoroute_network::node::NodeIdx;

use crate::error::FlowError;
use crate::flow::Flow;
use crate::problem::{FlowProblem, ProblemArc};
use crate::solution::Solution;

/// Check a returned flow against the formulated problem: every entry must
/// lie on a problem arc within its bound, and each node's net flow must
/// equal its supply exactly. A failing flow is rejected, never repaired.
pub fn validate_flow(problem: &FlowProblem, flow: &Flow) -> Result<(), FlowError> {
    let by_pair: FxHashMap<(NodeIdx, NodeIdx), &ProblemArc> = problem
        .arcs()
        .iter()
        .map(|arc| ((arc.from(), arc.to()), arc))
        .collect();

    let node_count = problem.node_names().len();
    let mut balance = vec![0i64; node_count];
    for (from, to, units) in flow.entries() {
        let arc = by_pair
            .get(&(from, to))
            .ok_or_else(|| FlowError::UnknownArc {
                from: problem.node_name(from).to_string(),
                to: problem.node_name(to).to_string(),
            })?;
        if units > arc.capacity() {
            return Err(FlowError::CapacityExceeded {
                link: arc.id().to_string(),
                units,
                capacity: arc.capacity(),
            });
        }
        balance[from.get()] += units as i64;
        balance[to.get()] -= units as i64;
    }

    for (i, (&actual, &expected)) in balance.iter().zip(problem.supplies()).enumerate() {
        if actual != expected {
            return Err(FlowError::ConservationViolation {
                node: problem.node_name(NodeIdx::new(i)).to_string(),
                expected,
                actual,
            });
        }
    }
    Ok(())
}

pub fn validate_solution(problem: &FlowProblem, solution: &Solution) -> Result<(), FlowError> {
    validate_flow(problem, solution.flow())
}
