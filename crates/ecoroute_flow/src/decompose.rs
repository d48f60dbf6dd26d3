use tracing::debug;

use ecoroute_network::graph::Graph;
use ecoroute_network::node::NodeIdx;

use crate::error::FlowError;
use crate::flow::Flow;

/// Drain an aggregate flow into individual unit paths.
///
/// Starting from `starts` (or, when not given, every node whose outflow
/// exceeds its inflow), one path-walk is seeded per surplus unit. Each step
/// consumes one unit from the first outgoing arc with remaining flow — the
/// scan follows the graph's link-insertion order, so the tie-break between
/// admissible arcs is the lowest link id. A walk ends when the node it
/// reaches has no remaining outflow.
///
/// The flow itself is not mutated. Any unit the walks cannot drain is an
/// error; units are never silently dropped.
pub fn decompose(
    graph: &Graph,
    flow: &Flow,
    starts: Option<&[NodeIdx]>,
) -> Result<Vec<Vec<NodeIdx>>, FlowError> {
    let node_count = graph.node_count();
    let mut inflow = vec![0u64; node_count];
    let mut outflow = vec![0u64; node_count];
    for (from, to, units) in flow.entries() {
        outflow[from.get()] += units;
        inflow[to.get()] += units;
    }

    let starts: Vec<NodeIdx> = match starts {
        Some(given) => {
            let mut starts = given.to_vec();
            starts.sort();
            starts.dedup();
            starts
        }
        None => (0..node_count)
            .map(NodeIdx::new)
            .filter(|n| outflow[n.get()] > inflow[n.get()])
            .collect(),
    };

    let mut remaining = flow.clone();
    let mut remaining_out = outflow.clone();
    let mut paths = Vec::new();
    let mut stack: Vec<(NodeIdx, Vec<NodeIdx>)> = Vec::new();

    for &start in &starts {
        let surplus = outflow[start.get()] as i64 - inflow[start.get()] as i64;
        for _ in 0..surplus.max(0) {
            stack.push((start, vec![start]));
        }

        while let Some((node, mut path)) = stack.pop() {
            let next = graph.outgoing(node).iter().find_map(|&link| {
                let head = graph.link(link).to();
                (remaining.units(node, head) > 0).then_some(head)
            });
            let Some(head) = next else {
                return Err(FlowError::DecompositionInconsistency {
                    node: graph.node(node).name().to_string(),
                });
            };

            remaining.set_units(node, head, remaining.units(node, head) - 1);
            remaining_out[node.get()] -= 1;
            path.push(head);

            if remaining_out[head.get()] > 0 {
                stack.push((head, path));
            } else {
                paths.push(path);
            }
        }
    }

    if let Some((from, to, units)) = remaining.entries().next() {
        let link = graph
            .link_between(from, to)
            .map(|l| graph.link(l).external_id().to_string())
            .unwrap_or_else(|| {
                format!("{} -> {}", graph.node(from).name(), graph.node(to).name())
            });
        return Err(FlowError::UndrainedFlow { link, units });
    }

    debug!(paths = paths.len(), "decomposed flow");
    Ok(paths)
}
