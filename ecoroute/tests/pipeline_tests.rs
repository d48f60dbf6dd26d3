use std::cell::Cell;

use ecoroute::flow::demand::{Demand, DemandEntry};
use ecoroute::flow::error::FlowError;
use ecoroute::flow::flow::Flow;
use ecoroute::flow::problem::{FlowProblem, Objective};
use ecoroute::flow::solution::Solution;
use ecoroute::flow::solver::{MultiObjectiveSolver, SolverError};
use ecoroute::network::capacity::CapacityPolicy;
use ecoroute::network::graph::{Graph, GraphBuilder, LinkSpec};
use ecoroute::network::import;
use ecoroute::network::link::LinkKind;
use ecoroute::network::node::{NodeIdx, NodeName};
use ecoroute::pipeline::{self, PlanError, PlanOptions};

struct StubSolver {
    solutions: Vec<Solution>,
    calls: Cell<usize>,
}

impl StubSolver {
    fn new(solutions: Vec<Solution>) -> StubSolver {
        StubSolver {
            solutions,
            calls: Cell::new(0),
        }
    }
}

impl MultiObjectiveSolver for StubSolver {
    fn solve(&self, _problem: &FlowProblem) -> Result<Vec<Solution>, SolverError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.solutions.clone())
    }
}

/// Fails transiently `failures` times, then delegates to the stub.
struct FlakySolver {
    inner: StubSolver,
    failures: Cell<usize>,
}

impl MultiObjectiveSolver for FlakySolver {
    fn solve(&self, problem: &FlowProblem) -> Result<Vec<Solution>, SolverError> {
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            self.inner.calls.set(self.inner.calls.get() + 1);
            return Err(SolverError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "out of memory".to_string(),
            });
        }
        self.inner.solve(problem)
    }
}

struct MalformedSolver {
    calls: Cell<usize>,
}

impl MultiObjectiveSolver for MalformedSolver {
    fn solve(&self, _problem: &FlowProblem) -> Result<Vec<Solution>, SolverError> {
        self.calls.set(self.calls.get() + 1);
        Err(SolverError::MalformedOutput {
            line: 1,
            message: "expected a bracketed objective vector".to_string(),
        })
    }
}

fn road(id: &str, from: &str, to: &str, lanes: u32, length: f64) -> LinkSpec {
    LinkSpec {
        id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        kind: LinkKind::Road,
        lanes,
        length,
        speed: 15.0,
    }
}

fn node(graph: &Graph, name: &str) -> NodeIdx {
    graph.node_by_name(name).unwrap()
}

/// One arc A -> B of capacity 3 (3 lanes at 15 m/s under the default
/// policy), length 5 per unit.
fn two_node_graph() -> Graph {
    let mut builder = GraphBuilder::new();
    builder.add_link(road("ab", "A", "B", 3, 5.0)).unwrap();
    builder.build(&CapacityPolicy::default())
}

/// A -> {B, C} -> D with capacity 2 on every arc; the B branch is fast and
/// dirty, the C branch slow and clean.
fn diamond_graph() -> Graph {
    let mut builder = GraphBuilder::new();
    builder.add_link(road("ab", "A", "B", 2, 100.0)).unwrap();
    builder.add_link(road("ac", "A", "C", 2, 100.0)).unwrap();
    builder.add_link(road("bd", "B", "D", 2, 100.0)).unwrap();
    builder.add_link(road("cd", "C", "D", 2, 100.0)).unwrap();
    let mut graph = builder.build(&CapacityPolicy::default());

    let costs = "\
link\tttime\tavgspeed\tcost_co2
ab\t10\t15\t100
bd\t10\t15\t100
ac\t20\t7.5\t10
cd\t20\t7.5\t10
";
    let (labels, rows) = import::parse_cost_table(costs).unwrap();
    import::apply_costs(&mut graph, &labels, &rows, &CapacityPolicy::default());
    graph
}

fn units(graph: &Graph, pairs: &[(&str, &str, u64)]) -> Flow {
    let mut flow = Flow::new();
    for &(from, to, n) in pairs {
        flow.set_units(node(graph, from), node(graph, to), n);
    }
    flow
}

#[test]
fn two_node_demand_yields_a_single_solution() {
    let graph = two_node_graph();
    let a = node(&graph, "A");
    let b = node(&graph, "B");
    let demand = Demand::new(vec![DemandEntry::new(3, 0.0, "Car", a, b)]);

    let solver = StubSolver::new(vec![Solution::new(
        vec![15],
        units(&graph, &[("A", "B", 3)]),
    )]);
    let options = PlanOptions::new(vec![Objective::new("length", 1)]);
    let outcome = pipeline::optimize(&graph, &demand, &options, &solver).unwrap();

    let solutions = outcome.solutions();
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].solution().objectives(), &[15]);
    assert_eq!(solutions[0].evaluation().total("length"), 15.0);

    let plan = pipeline::describe_solution(&graph, &demand, solutions[0].solution()).unwrap();
    assert_eq!(plan.routes().len(), 1);
    assert_eq!(plan.routes()[0].vehicles(), 3);
    assert_eq!(plan.vehicles().len(), 3);

    let predicted = ecoroute::flow::evaluate::evaluate_plan_vehicles(&graph, &plan);
    assert_eq!(predicted.len(), 3);
    assert!(predicted.iter().all(|ev| ev.total("length") == 5.0));
}

#[test]
fn diamond_demand_yields_a_pareto_front() {
    let graph = diamond_graph();
    let a = node(&graph, "A");
    let d = node(&graph, "D");
    let demand = Demand::new(vec![DemandEntry::new(3, 0.0, "Car", a, d)]);

    let fast = Solution::new(
        vec![80, 420],
        units(&graph, &[("A", "B", 2), ("B", "D", 2), ("A", "C", 1), ("C", "D", 1)]),
    );
    let clean = Solution::new(
        vec![100, 240],
        units(&graph, &[("A", "B", 1), ("B", "D", 1), ("A", "C", 2), ("C", "D", 2)]),
    );
    let solver = StubSolver::new(vec![fast, clean]);
    let options = PlanOptions::new(vec![
        Objective::new("ttime", 1),
        Objective::new("cost_co2", 1),
    ]);
    let outcome = pipeline::optimize(&graph, &demand, &options, &solver).unwrap();

    let solutions = outcome.solutions();
    assert_eq!(solutions.len(), 2);
    assert_eq!(solutions[0].evaluation().total("ttime"), 80.0);
    assert_eq!(solutions[0].evaluation().total("cost_co2"), 420.0);
    assert_eq!(solutions[1].evaluation().total("cost_co2"), 240.0);

    for evaluated in solutions {
        let plan = pipeline::describe_solution(&graph, &demand, evaluated.solution()).unwrap();
        // three unit paths split across the two parallel branches
        let total: u64 = plan.routes().iter().map(|r| r.vehicles()).sum();
        assert_eq!(total, 3);
        assert_eq!(plan.routes().len(), 2);
        // decomposition is conservative: the plan reproduces the flow
        assert_eq!(&plan.to_flow(&graph), evaluated.solution().flow());
    }
}

#[test]
fn a_perturbed_flow_is_rejected_before_evaluation() {
    let graph = diamond_graph();
    let a = node(&graph, "A");
    let d = node(&graph, "D");
    let demand = Demand::new(vec![DemandEntry::new(3, 0.0, "Car", a, d)]);

    // one unit vanishes at B
    let solver = StubSolver::new(vec![Solution::new(
        vec![70, 400],
        units(&graph, &[("A", "B", 2), ("B", "D", 1), ("A", "C", 1), ("C", "D", 1)]),
    )]);
    let options = PlanOptions::new(vec![
        Objective::new("ttime", 1),
        Objective::new("cost_co2", 1),
    ]);
    let err = pipeline::optimize(&graph, &demand, &options, &solver).unwrap_err();
    assert!(matches!(
        err,
        PlanError::Flow(FlowError::ConservationViolation { node, .. }) if node == "B"
    ));
}

#[test]
fn zero_solver_solutions_mean_infeasible() {
    let graph = two_node_graph();
    let a = node(&graph, "A");
    let b = node(&graph, "B");
    let demand = Demand::new(vec![DemandEntry::new(3, 0.0, "Car", a, b)]);

    let solver = StubSolver::new(vec![]);
    let options = PlanOptions::new(vec![Objective::new("length", 1)]);
    let outcome = pipeline::optimize(&graph, &demand, &options, &solver).unwrap();
    assert!(outcome.is_infeasible());
    assert!(outcome.solutions().is_empty());
    assert_eq!(solver.calls.get(), 1);
}

#[test]
fn unreachable_sink_is_infeasible_without_invoking_the_solver() {
    let mut builder = GraphBuilder::new();
    builder.add_link(road("ab", "A", "B", 1, 5.0)).unwrap();
    builder.add_node(NodeName::physical("Z"), None);
    let graph = builder.build(&CapacityPolicy::default());

    let demand = Demand::new(vec![DemandEntry::new(
        1,
        0.0,
        "Car",
        node(&graph, "A"),
        node(&graph, "Z"),
    )]);
    let solver = StubSolver::new(vec![]);
    let options = PlanOptions::new(vec![Objective::new("length", 1)]);
    let outcome = pipeline::optimize(&graph, &demand, &options, &solver).unwrap();
    assert!(outcome.is_infeasible());
    assert_eq!(solver.calls.get(), 0);
}

#[test]
fn a_transient_failure_is_retried_exactly_once() {
    let graph = two_node_graph();
    let a = node(&graph, "A");
    let b = node(&graph, "B");
    let demand = Demand::new(vec![DemandEntry::new(3, 0.0, "Car", a, b)]);
    let options = PlanOptions::new(vec![Objective::new("length", 1)]);

    let solver = FlakySolver {
        inner: StubSolver::new(vec![Solution::new(
            vec![15],
            units(&graph, &[("A", "B", 3)]),
        )]),
        failures: Cell::new(1),
    };
    let outcome = pipeline::optimize(&graph, &demand, &options, &solver).unwrap();
    assert_eq!(outcome.solutions().len(), 1);
    assert_eq!(solver.inner.calls.get(), 2);

    // a second consecutive failure is fatal
    let solver = FlakySolver {
        inner: StubSolver::new(vec![]),
        failures: Cell::new(2),
    };
    let err = pipeline::optimize(&graph, &demand, &options, &solver).unwrap_err();
    assert!(matches!(err, PlanError::Solver(SolverError::Failed { .. })));
    assert_eq!(solver.inner.calls.get(), 2);
}

#[test]
fn a_parse_failure_is_not_retried() {
    let graph = two_node_graph();
    let a = node(&graph, "A");
    let b = node(&graph, "B");
    let demand = Demand::new(vec![DemandEntry::new(1, 0.0, "Car", a, b)]);
    let options = PlanOptions::new(vec![Objective::new("length", 1)]);

    let solver = MalformedSolver {
        calls: Cell::new(0),
    };
    let err = pipeline::optimize(&graph, &demand, &options, &solver).unwrap_err();
    assert!(matches!(
        err,
        PlanError::Solver(SolverError::MalformedOutput { .. })
    ));
    assert_eq!(solver.calls.get(), 1);
}
