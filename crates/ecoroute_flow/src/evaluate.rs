use std::collections::BTreeMap;

use serde::Serialize;

use ecoroute_network::graph::Graph;
use ecoroute_network::link::LinkIdx;

use crate::error::FlowError;
use crate::flow::Flow;
use crate::route::RoutePlan;

/// Scalar totals of one flow under every evaluation label, plus the
/// diagnostic split of traversed length into free-flowing and congested
/// links (each traversed arc counted once, regardless of its units).
#[derive(Serialize, Debug, Clone, Default)]
pub struct FlowEvaluation {
    totals: BTreeMap<String, f64>,
    free_flow_length: f64,
    congested_length: f64,
}

impl FlowEvaluation {
    pub fn totals(&self) -> &BTreeMap<String, f64> {
        &self.totals
    }

    pub fn total(&self, label: &str) -> f64 {
        self.totals.get(label).copied().unwrap_or(0.0)
    }

    pub fn free_flow_length(&self) -> f64 {
        self.free_flow_length
    }

    pub fn congested_length(&self) -> f64 {
        self.congested_length
    }
}

/// Sum `units * cost` over the flow for every evaluation label.
pub fn evaluate_flow(graph: &Graph, flow: &Flow) -> Result<FlowEvaluation, FlowError> {
    let labels = graph.evaluation_labels();
    let mut evaluation = FlowEvaluation::default();
    for label in &labels {
        evaluation.totals.insert(label.clone(), 0.0);
    }

    for (from, to, units) in flow.entries() {
        let link = graph
            .link_between(from, to)
            .ok_or_else(|| FlowError::MissingArc {
                from: graph.node(from).name().to_string(),
                to: graph.node(to).name().to_string(),
            })?;
        let link = graph.link(link);

        if link.is_free_flowing() {
            evaluation.free_flow_length += link.length();
        } else {
            evaluation.congested_length += link.length();
        }
        for label in &labels {
            let per_unit = link.cost(label).unwrap_or(0.0);
            *evaluation.totals.get_mut(label).expect("label present") +=
                units as f64 * per_unit;
        }
    }
    Ok(evaluation)
}

/// Per-label totals of one link sequence, with the contributing links kept
/// for diagnostics (only links with a nonzero share are listed).
#[derive(Serialize, Debug, Clone, Default)]
pub struct RouteEvaluation {
    totals: BTreeMap<String, f64>,
    contributions: BTreeMap<String, Vec<(LinkIdx, f64)>>,
}

impl RouteEvaluation {
    pub fn totals(&self) -> &BTreeMap<String, f64> {
        &self.totals
    }

    pub fn total(&self, label: &str) -> f64 {
        self.totals.get(label).copied().unwrap_or(0.0)
    }

    pub fn contributions(&self, label: &str) -> &[(LinkIdx, f64)] {
        self.contributions
            .get(label)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub fn evaluate_route(graph: &Graph, links: &[LinkIdx]) -> RouteEvaluation {
    let labels = graph.evaluation_labels();
    let mut evaluation = RouteEvaluation::default();
    for label in &labels {
        evaluation.totals.insert(label.clone(), 0.0);
        evaluation.contributions.insert(label.clone(), Vec::new());
    }

    for &idx in links {
        let link = graph.link(idx);
        for label in &labels {
            let per_unit = link.cost(label).unwrap_or(0.0);
            *evaluation.totals.get_mut(label).expect("label present") += per_unit;
            if per_unit > 0.0 {
                evaluation
                    .contributions
                    .get_mut(label)
                    .expect("label present")
                    .push((idx, per_unit));
            }
        }
    }
    evaluation
}

/// Predicted per-vehicle costs: one route evaluation per vehicle, in vehicle
/// order.
pub fn evaluate_plan_vehicles(graph: &Graph, plan: &RoutePlan) -> Vec<RouteEvaluation> {
    plan.vehicles()
        .iter()
        .map(|vehicle| evaluate_route(graph, plan.route(vehicle.route()).links()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecoroute_network::capacity::CapacityPolicy;
    use ecoroute_network::graph::{GraphBuilder, LinkSpec};
    use ecoroute_network::import;
    use ecoroute_network::link::LinkKind;
    use ecoroute_network::node::NodeIdx;

    fn graph() -> Graph {
        let mut builder = GraphBuilder::new();
        for (id, from, to) in [("ab", "A", "B"), ("bc", "B", "C")] {
            builder
                .add_link(LinkSpec {
                    id: id.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                    kind: LinkKind::Road,
                    lanes: 1,
                    length: 100.0,
                    speed: 10.0,
                })
                .unwrap();
        }
        let mut graph = builder.build(&CapacityPolicy::default());
        let costs = "\
link\tttime\tavgspeed\tcost_co2
ab\t25.0\t4.0\t500.0
bc\t10.0\t10.0\t80.0
";
        let (labels, rows) = import::parse_cost_table(costs).unwrap();
        import::apply_costs(&mut graph, &labels, &rows, &CapacityPolicy::default());
        graph
    }

    fn node(graph: &Graph, name: &str) -> NodeIdx {
        graph.node_by_name(name).unwrap()
    }

    #[test]
    fn weights_costs_by_units() {
        let graph = graph();
        let mut flow = Flow::new();
        flow.set_units(node(&graph, "A"), node(&graph, "B"), 3);
        flow.set_units(node(&graph, "B"), node(&graph, "C"), 3);
        let evaluation = evaluate_flow(&graph, &flow).unwrap();

        assert_eq!(evaluation.total("cost_co2"), 3.0 * 500.0 + 3.0 * 80.0);
        assert_eq!(evaluation.total("ttime"), 3.0 * 25.0 + 3.0 * 10.0);
        assert_eq!(evaluation.total("length"), 600.0);
        // ab is congested (4 < 10), bc is free-flowing
        assert_eq!(evaluation.congested_length(), 100.0);
        assert_eq!(evaluation.free_flow_length(), 100.0);
    }

    #[test]
    fn route_evaluation_lists_contributing_links() {
        let graph = graph();
        let ab = graph.link_by_id("ab").unwrap();
        let bc = graph.link_by_id("bc").unwrap();
        let evaluation = evaluate_route(&graph, &[ab, bc]);

        assert_eq!(evaluation.total("cost_co2"), 580.0);
        assert_eq!(
            evaluation.contributions("cost_co2").to_vec(),
            vec![(ab, 500.0), (bc, 80.0)]
        );
    }

    #[test]
    fn flow_off_graph_is_an_error() {
        let graph = graph();
        let mut flow = Flow::new();
        flow.set_units(node(&graph, "A"), node(&graph, "C"), 1);
        assert!(matches!(
            evaluate_flow(&graph, &flow),
            Err(FlowError::MissingArc { .. })
        ));
    }
}
