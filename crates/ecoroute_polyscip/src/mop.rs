use std::fmt::Write;

use ecoroute_flow::problem::{FlowProblem, FrontMode};

/// Render a flow problem in the solver's MOP layout (an MPS-like free
/// format): one `N` row per objective, one `E` row per node, `L`-prefixed
/// arc columns with their objective coefficients and ±1 node incidences,
/// negated net supplies as the right-hand side, and per-arc bounds —
/// integer `UI` bounds for the full front, `LO`/`UP` pairs when only
/// extremal solutions are requested.
pub fn render_problem(problem: &FlowProblem) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "NAME {}", problem.name());
    out.push_str("OBJSENSE\n MIN\n");

    out.push_str("ROWS\n");
    for objective in problem.objectives() {
        let _ = writeln!(out, " N {}", objective.label());
    }
    for node in problem.node_names() {
        let _ = writeln!(out, " E N{node}");
    }

    out.push_str("COLUMNS\n");
    for arc in problem.arcs() {
        for (objective, cost) in problem.objectives().iter().zip(arc.costs()) {
            let _ = writeln!(out, "\tL{}\t{}\t{}", arc.id(), objective.label(), cost);
        }
        let _ = writeln!(out, "\tL{}\tN{}\t-1", arc.id(), problem.node_name(arc.from()));
        let _ = writeln!(out, "\tL{}\tN{}\t1", arc.id(), problem.node_name(arc.to()));
    }

    out.push_str("RHS\n");
    for (node, supply) in problem.node_names().iter().zip(problem.supplies()) {
        let _ = writeln!(out, "\tRHS\tN{node}\t{}", -supply);
    }

    out.push_str("BOUNDS\n");
    for arc in problem.arcs() {
        match problem.mode() {
            FrontMode::Full => {
                let _ = writeln!(out, "\tUI\tBOUNDS\tL{}\t{}", arc.id(), arc.capacity());
            }
            FrontMode::ExtremalOnly => {
                let _ = writeln!(out, "\tLO\tBOUNDS\tL{}\t0", arc.id());
                let _ = writeln!(out, "\tUP\tBOUNDS\tL{}\t{}", arc.id(), arc.capacity());
            }
        }
    }

    out.push_str("ENDATA\n");
    out
}
