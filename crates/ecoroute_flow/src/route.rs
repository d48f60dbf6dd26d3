use serde::Serialize;

use ecoroute_network::define_index_newtype;
use ecoroute_network::graph::Graph;
use ecoroute_network::link::LinkIdx;
use ecoroute_network::node::NodeIdx;

use crate::assign::Vehicle;
use crate::error::FlowError;
use crate::flow::Flow;

define_index_newtype!(RouteIdx, Route);

/// One source-to-sink path through the expanded graph, with the number of
/// vehicles sent along it. A transient view over the graph — it references
/// nodes and links by index only.
#[derive(Serialize, Debug, Clone)]
pub struct Route {
    nodes: Vec<NodeIdx>,
    links: Vec<LinkIdx>,
    vehicles: u64,
}

impl Route {
    pub fn from_nodes(graph: &Graph, nodes: Vec<NodeIdx>) -> Result<Route, FlowError> {
        let links = project_links(graph, &nodes)?;
        Ok(Route {
            nodes,
            links,
            vehicles: 0,
        })
    }

    pub fn nodes(&self) -> &[NodeIdx] {
        &self.nodes
    }

    pub fn links(&self) -> &[LinkIdx] {
        &self.links
    }

    pub fn vehicles(&self) -> u64 {
        self.vehicles
    }

    pub fn source(&self) -> NodeIdx {
        self.nodes[0]
    }

    pub fn sink(&self) -> NodeIdx {
        self.nodes[self.nodes.len() - 1]
    }

    /// The route restricted to physical road segments, via connectors
    /// dropped.
    pub fn physical_links(&self, graph: &Graph) -> Vec<LinkIdx> {
        self.links
            .iter()
            .copied()
            .filter(|&link| !graph.link(link).is_via())
            .collect()
    }

    pub(crate) fn add_vehicles(&mut self, count: u64) {
        self.vehicles += count;
    }
}

/// Project a node path onto the unique links joining its consecutive nodes.
/// Every pair must resolve; a gap means the path does not belong to this
/// graph.
pub fn project_links(graph: &Graph, nodes: &[NodeIdx]) -> Result<Vec<LinkIdx>, FlowError> {
    let mut links = Vec::with_capacity(nodes.len().saturating_sub(1));
    for pair in nodes.windows(2) {
        let link =
            graph
                .link_between(pair[0], pair[1])
                .ok_or_else(|| FlowError::MissingArc {
                    from: graph.node(pair[0]).name().to_string(),
                    to: graph.node(pair[1]).name().to_string(),
                })?;
        links.push(link);
    }
    Ok(links)
}

/// Routes plus the vehicles bound to them: the structure handed to the
/// downstream simulation-file generator.
#[derive(Serialize, Debug, Clone)]
pub struct RoutePlan {
    routes: Vec<Route>,
    vehicles: Vec<Vehicle>,
}

impl RoutePlan {
    pub(crate) fn new(routes: Vec<Route>, vehicles: Vec<Vehicle>) -> RoutePlan {
        RoutePlan { routes, vehicles }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, idx: RouteIdx) -> &Route {
        &self.routes[idx]
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Rebuild the aggregate flow this plan realizes: each route contributes
    /// its vehicle count on each of its arcs.
    pub fn to_flow(&self, graph: &Graph) -> Flow {
        let routes: Vec<Vec<LinkIdx>> = self.routes.iter().map(|r| r.links.clone()).collect();
        let counts: Vec<u64> = self.routes.iter().map(|r| r.vehicles).collect();
        Flow::from_route_counts(graph, &routes, &counts)
    }
}
