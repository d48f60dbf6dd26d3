use fxhash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::capacity::{CapacityPolicy, VIA_SPEED};
use crate::error::NetworkError;
use crate::graph::{Graph, GraphBuilder};
use crate::link::LinkKind;
use crate::node::{NodeIdx, NodeName, Position, TurnSide};

pub struct RawJunction {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

pub struct RawEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub lanes: u32,
    pub length: f64,
    pub speed: f64,
}

/// One allowed turning movement: traffic leaving `from_edge` may continue
/// onto `to_edge`.
pub struct TurnMovement {
    pub from_edge: String,
    pub to_edge: String,
}

pub struct RoadNetwork {
    pub junctions: Vec<RawJunction>,
    pub edges: Vec<RawEdge>,
    pub movements: Vec<TurnMovement>,
}

/// Expand junctions into per-movement turn nodes.
///
/// Every edge gets its own numbered `Out` slot at its origin junction and
/// `In` slot at its destination junction, and each allowed movement becomes
/// one via link between the corresponding In and Out nodes. Turns at a
/// junction thus saturate independently instead of sharing one node.
pub fn expand_junctions(
    network: &RoadNetwork,
    policy: &CapacityPolicy,
) -> Result<Graph, NetworkError> {
    let positions: FxHashMap<&str, Position> = network
        .junctions
        .iter()
        .map(|j| (j.id.as_str(), Position { x: j.x, y: j.y }))
        .collect();

    let mut builder = GraphBuilder::new();
    let mut out_slots: FxHashMap<&str, u32> = FxHashMap::default();
    let mut in_slots: FxHashMap<&str, u32> = FxHashMap::default();
    let mut endpoints: FxHashMap<&str, (NodeIdx, NodeIdx)> = FxHashMap::default();

    for edge in &network.edges {
        let from_pos = *positions
            .get(edge.from.as_str())
            .ok_or_else(|| NetworkError::MissingJunction {
                edge: edge.id.clone(),
                junction: edge.from.clone(),
            })?;
        let to_pos = *positions
            .get(edge.to.as_str())
            .ok_or_else(|| NetworkError::MissingJunction {
                edge: edge.id.clone(),
                junction: edge.to.clone(),
            })?;

        let out_slot = out_slots.entry(edge.from.as_str()).or_insert(0);
        *out_slot += 1;
        let tail = builder.add_node(
            NodeName::turn(edge.from.clone(), *out_slot, TurnSide::Out),
            Some(from_pos),
        );

        let in_slot = in_slots.entry(edge.to.as_str()).or_insert(0);
        *in_slot += 1;
        let head = builder.add_node(
            NodeName::turn(edge.to.clone(), *in_slot, TurnSide::In),
            Some(to_pos),
        );

        builder.add_link_between(
            edge.id.clone(),
            tail,
            head,
            LinkKind::Road,
            edge.lanes,
            edge.length,
            edge.speed,
        )?;
        endpoints.insert(edge.id.as_str(), (tail, head));
    }

    let edges_by_id: FxHashMap<&str, &RawEdge> =
        network.edges.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut via_slots: FxHashMap<&str, u32> = FxHashMap::default();
    let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
    for movement in &network.movements {
        if !seen.insert((movement.from_edge.as_str(), movement.to_edge.as_str())) {
            continue;
        }
        let incoming =
            edges_by_id
                .get(movement.from_edge.as_str())
                .ok_or_else(|| NetworkError::UnknownEdge {
                    edge: movement.from_edge.clone(),
                })?;
        let outgoing =
            edges_by_id
                .get(movement.to_edge.as_str())
                .ok_or_else(|| NetworkError::UnknownEdge {
                    edge: movement.to_edge.clone(),
                })?;
        if incoming.to != outgoing.from {
            return Err(NetworkError::InvalidMovement {
                from_edge: movement.from_edge.clone(),
                to_edge: movement.to_edge.clone(),
            });
        }

        let junction = incoming.to.as_str();
        let slot = via_slots.entry(junction).or_insert(0);
        *slot += 1;

        let (_, arrival) = endpoints[movement.from_edge.as_str()];
        let (departure, _) = endpoints[movement.to_edge.as_str()];
        builder.add_link_between(
            format!("J-{junction}-{slot}"),
            arrival,
            departure,
            LinkKind::Via,
            1,
            0.0,
            VIA_SPEED,
        )?;
    }

    let graph = builder.build(policy);
    debug!(
        nodes = graph.node_count(),
        links = graph.link_count(),
        "expanded junction network"
    );
    Ok(graph)
}
