use thiserror::Error;
use tracing::{info, warn};

use ecoroute_flow::assign::assign_vehicles;
use ecoroute_flow::decompose::decompose;
use ecoroute_flow::demand::Demand;
use ecoroute_flow::error::FlowError;
use ecoroute_flow::evaluate::{FlowEvaluation, evaluate_flow};
use ecoroute_flow::flow::Flow;
use ecoroute_flow::problem::{FlowProblem, FrontMode, Objective};
use ecoroute_flow::route::RoutePlan;
use ecoroute_flow::solution::Solution;
use ecoroute_flow::solver::{MultiObjectiveSolver, SolverError};
use ecoroute_flow::validate::validate_solution;
use ecoroute_network::graph::Graph;

pub struct PlanOptions {
    pub name: String,
    pub objectives: Vec<Objective>,
    pub front_mode: FrontMode,
    pub capacity_override: Option<u64>,
    pub background: Option<Flow>,
}

impl PlanOptions {
    pub fn new(objectives: Vec<Objective>) -> PlanOptions {
        PlanOptions {
            name: "moProblem".to_string(),
            objectives,
            front_mode: FrontMode::Full,
            capacity_override: None,
            background: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvaluatedSolution {
    solution: Solution,
    evaluation: FlowEvaluation,
}

impl EvaluatedSolution {
    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn evaluation(&self) -> &FlowEvaluation {
        &self.evaluation
    }
}

/// Outcome of one optimization run. Infeasible demand is a value, not an
/// error; "not yet computed" is simply the absence of an outcome on the
/// caller's side.
#[derive(Debug)]
pub enum PlanOutcome {
    Infeasible,
    Front(Vec<EvaluatedSolution>),
}

impl PlanOutcome {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, PlanOutcome::Infeasible)
    }

    pub fn solutions(&self) -> &[EvaluatedSolution] {
        match self {
            PlanOutcome::Infeasible => &[],
            PlanOutcome::Front(solutions) => solutions,
        }
    }
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Formulate the flow problem, hand it to the solver and strictly validate
/// and evaluate every returned Pareto point.
///
/// The solver gets one retry when the invocation itself fails; a second
/// failure is fatal to the run. Inputs are never mutated, so a shared graph
/// can back concurrent independent runs.
pub fn optimize(
    graph: &Graph,
    demand: &Demand,
    options: &PlanOptions,
    solver: &dyn MultiObjectiveSolver,
) -> Result<PlanOutcome, PlanError> {
    let reachable = graph.reachable_from(&demand.sources());
    if demand.sinks().iter().any(|sink| !reachable[sink.get()]) {
        info!("a sink is unreachable from every source, demand is infeasible");
        return Ok(PlanOutcome::Infeasible);
    }

    let mut builder = FlowProblem::builder(graph);
    builder
        .set_name(options.name.as_str())
        .set_demand(demand)
        .set_objectives(options.objectives.clone())
        .set_front_mode(options.front_mode);
    if let Some(capacity) = options.capacity_override {
        builder.set_capacity_override(capacity);
    }
    if let Some(background) = &options.background {
        builder.set_background_flow(background);
    }
    let problem = builder.build()?;

    let solutions = match solver.solve(&problem) {
        Ok(solutions) => solutions,
        Err(e) if e.is_transient() => {
            warn!(error = %e, "solver invocation failed, retrying once");
            solver.solve(&problem)?
        }
        Err(e) => return Err(e.into()),
    };
    if solutions.is_empty() {
        info!("solver returned no solutions, demand is infeasible");
        return Ok(PlanOutcome::Infeasible);
    }

    let mut front = Vec::with_capacity(solutions.len());
    for solution in solutions {
        validate_solution(&problem, &solution)?;
        let evaluation = evaluate_flow(graph, solution.flow())?;
        info!(objectives = ?solution.objectives(), "accepted solution");
        front.push(EvaluatedSolution {
            solution,
            evaluation,
        });
    }
    Ok(PlanOutcome::Front(front))
}

/// Turn one accepted solution into a concrete route plan: decompose its flow
/// seeded at the demand's sources, then bind trips to the unit paths.
/// Recomputed per solution; the graph, demand and solution stay untouched.
pub fn describe_solution(
    graph: &Graph,
    demand: &Demand,
    solution: &Solution,
) -> Result<RoutePlan, PlanError> {
    let starts = demand.sources();
    let paths = decompose(graph, solution.flow(), Some(&starts))?;
    let trips = demand.trips();
    Ok(assign_vehicles(graph, &paths, &trips)?)
}
