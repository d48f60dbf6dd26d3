use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("unknown cost label {label}")]
    UnknownCostLabel { label: String },

    #[error("unknown node {name} in demand")]
    UnknownNode { name: String },

    #[error("demand line {line}: {message}")]
    MalformedDemand { line: usize, message: String },

    #[error("demand files are misaligned: {pairs} source/sink pairs, {departures} departures")]
    MisalignedDemand { pairs: usize, departures: usize },

    #[error("flow uses arc {from} -> {to} which is not part of the problem")]
    UnknownArc { from: String, to: String },

    #[error("arc {link} carries {units} units, capacity is {capacity}")]
    CapacityExceeded {
        link: String,
        units: u64,
        capacity: u64,
    },

    #[error("conservation violated at node {node}: net flow {actual}, supply {expected}")]
    ConservationViolation {
        node: String,
        expected: i64,
        actual: i64,
    },

    #[error("decomposition stranded at node {node} with no remaining outgoing flow")]
    DecompositionInconsistency { node: String },

    #[error("decomposition left {units} units undrained on arc {link}")]
    UndrainedFlow { link: String, units: u64 },

    #[error("no arc joins {from} to {to} on a decomposed route")]
    MissingArc { from: String, to: String },

    #[error("no pending trip travels {origin} -> {sink}")]
    UnmatchedRoute { origin: String, sink: String },

    #[error("{count} trips left without a route")]
    UnassignedTrips { count: usize },
}
