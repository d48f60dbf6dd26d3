use fxhash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use ecoroute_network::define_index_newtype;
use ecoroute_network::graph::Graph;
use ecoroute_network::node::NodeIdx;

use crate::demand::Trip;
use crate::error::FlowError;
use crate::route::{Route, RouteIdx, RoutePlan};

define_index_newtype!(VehicleIdx, Vehicle);

#[derive(Serialize, Debug, Clone)]
pub struct Vehicle {
    departure: f64,
    id: VehicleIdx,
    route: RouteIdx,
    vehicle_class: String,
}

impl Vehicle {
    pub fn departure(&self) -> f64 {
        self.departure
    }

    pub fn id(&self) -> VehicleIdx {
        self.id
    }

    pub fn route(&self) -> RouteIdx {
        self.route
    }

    pub fn vehicle_class(&self) -> &str {
        &self.vehicle_class
    }
}

/// Bind decomposed unit paths to trip requests.
///
/// `trips` must already be sorted by departure ([`crate::demand::Demand::trips`]
/// is). Paths are processed in decomposition order; each one merges into the
/// route set (identical node sequences share a route) and takes the earliest
/// pending trip with matching endpoints. Vehicle ids are positions in the
/// sorted trip order, so re-describing the same solution yields the same
/// ids.
pub fn assign_vehicles(
    graph: &Graph,
    paths: &[Vec<NodeIdx>],
    trips: &[Trip],
) -> Result<RoutePlan, FlowError> {
    let mut routes: Vec<Route> = Vec::new();
    let mut by_path: FxHashMap<&[NodeIdx], RouteIdx> = FxHashMap::default();
    let mut vehicles: Vec<Option<Vehicle>> = vec![None; trips.len()];

    for path in paths {
        let route_idx = match by_path.get(path.as_slice()) {
            Some(&idx) => idx,
            None => {
                let idx = RouteIdx::new(routes.len());
                routes.push(Route::from_nodes(graph, path.clone())?);
                by_path.insert(path.as_slice(), idx);
                idx
            }
        };
        routes[route_idx].add_vehicles(1);

        let source = path[0];
        let sink = path[path.len() - 1];
        let trip_idx = trips
            .iter()
            .enumerate()
            .position(|(i, trip)| {
                vehicles[i].is_none() && trip.source == source && trip.sink == sink
            })
            .ok_or_else(|| FlowError::UnmatchedRoute {
                origin: graph.node(source).name().to_string(),
                sink: graph.node(sink).name().to_string(),
            })?;
        vehicles[trip_idx] = Some(Vehicle {
            departure: trips[trip_idx].departure,
            id: VehicleIdx::new(trip_idx),
            route: route_idx,
            vehicle_class: trips[trip_idx].vehicle_class.clone(),
        });
    }

    let unassigned = vehicles.iter().filter(|v| v.is_none()).count();
    if unassigned > 0 {
        return Err(FlowError::UnassignedTrips { count: unassigned });
    }

    let vehicles: Vec<Vehicle> = vehicles.into_iter().flatten().collect();
    debug!(
        routes = routes.len(),
        vehicles = vehicles.len(),
        "assigned vehicles to routes"
    );
    Ok(RoutePlan::new(routes, vehicles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::{Demand, DemandEntry};
    use ecoroute_network::capacity::CapacityPolicy;
    use ecoroute_network::graph::{Graph, LinkSpec};
    use ecoroute_network::link::LinkKind;

    fn graph() -> Graph {
        let mut builder = Graph::builder();
        for (id, from, to) in [("ab", "A", "B"), ("ac", "A", "C"), ("bd", "B", "D"), ("cd", "C", "D")] {
            builder
                .add_link(LinkSpec {
                    id: id.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                    kind: LinkKind::Road,
                    lanes: 2,
                    length: 100.0,
                    speed: 15.0,
                })
                .unwrap();
        }
        builder.build(&CapacityPolicy::default())
    }

    fn idx(graph: &Graph, name: &str) -> NodeIdx {
        graph.node_by_name(name).unwrap()
    }

    #[test]
    fn merges_identical_paths_and_orders_by_departure() {
        let graph = graph();
        let a = idx(&graph, "A");
        let b = idx(&graph, "B");
        let c = idx(&graph, "C");
        let d = idx(&graph, "D");

        let paths = vec![vec![a, b, d], vec![a, c, d], vec![a, b, d]];
        let demand = Demand::new(vec![
            DemandEntry::new(1, 30.0, "Car", a, d),
            DemandEntry::new(1, 10.0, "Car", a, d),
            DemandEntry::new(1, 20.0, "Car", a, d),
        ]);
        let trips = demand.trips();
        let plan = assign_vehicles(&graph, &paths, &trips).unwrap();

        assert_eq!(plan.routes().len(), 2);
        assert_eq!(plan.routes()[0].vehicles(), 2);
        assert_eq!(plan.routes()[1].vehicles(), 1);

        // vehicles come out in departure order with stable ids
        let departures: Vec<f64> = plan.vehicles().iter().map(Vehicle::departure).collect();
        assert_eq!(departures, vec![10.0, 20.0, 30.0]);
        // first decomposed path binds the earliest trip
        assert_eq!(plan.vehicles()[0].route(), RouteIdx::new(0));
        assert_eq!(plan.vehicles()[1].route(), RouteIdx::new(1));
        assert_eq!(plan.vehicles()[2].route(), RouteIdx::new(0));
    }

    #[test]
    fn endpoint_mismatch_is_an_error() {
        let graph = graph();
        let a = idx(&graph, "A");
        let b = idx(&graph, "B");
        let d = idx(&graph, "D");

        let paths = vec![vec![a, b, d]];
        let demand = Demand::new(vec![DemandEntry::new(1, 0.0, "Car", a, b)]);
        let err = assign_vehicles(&graph, &paths, &demand.trips()).unwrap_err();
        assert!(matches!(err, FlowError::UnmatchedRoute { .. }));
    }

    #[test]
    fn leftover_trips_are_an_error() {
        let graph = graph();
        let a = idx(&graph, "A");
        let b = idx(&graph, "B");
        let d = idx(&graph, "D");

        let paths = vec![vec![a, b, d]];
        let demand = Demand::new(vec![
            DemandEntry::new(1, 0.0, "Car", a, d),
            DemandEntry::new(1, 5.0, "Car", a, d),
        ]);
        let err = assign_vehicles(&graph, &paths, &demand.trips()).unwrap_err();
        assert!(matches!(err, FlowError::UnassignedTrips { count: 1 }));
    }
}
