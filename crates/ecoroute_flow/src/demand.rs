use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use ecoroute_network::graph::Graph;
use ecoroute_network::node::NodeIdx;

use crate::error::FlowError;

/// One block of trips: `quantity` vehicles of one class leaving `source` for
/// `sink` in the same departure-time bucket.
#[derive(Serialize, Debug, Clone)]
pub struct DemandEntry {
    quantity: u64,
    departure: f64,
    vehicle_class: String,
    source: NodeIdx,
    sink: NodeIdx,
}

impl DemandEntry {
    pub fn new(
        quantity: u64,
        departure: f64,
        vehicle_class: impl Into<String>,
        source: NodeIdx,
        sink: NodeIdx,
    ) -> DemandEntry {
        DemandEntry {
            quantity,
            departure,
            vehicle_class: vehicle_class.into(),
            source,
            sink,
        }
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn departure(&self) -> f64 {
        self.departure
    }

    pub fn vehicle_class(&self) -> &str {
        &self.vehicle_class
    }

    pub fn source(&self) -> NodeIdx {
        self.source
    }

    pub fn sink(&self) -> NodeIdx {
        self.sink
    }
}

/// One trip request, the unit the assignment works in.
#[derive(Serialize, Debug, Clone)]
pub struct Trip {
    pub departure: f64,
    pub vehicle_class: String,
    pub source: NodeIdx,
    pub sink: NodeIdx,
}

/// Immutable trip demand for one optimization run.
#[derive(Serialize, Debug, Clone, Default)]
pub struct Demand {
    entries: Vec<DemandEntry>,
}

impl Demand {
    pub fn new(entries: Vec<DemandEntry>) -> Demand {
        Demand { entries }
    }

    pub fn entries(&self) -> &[DemandEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_units(&self) -> u64 {
        self.entries.iter().map(DemandEntry::quantity).sum()
    }

    /// Net supply per node: positive at sources, negative at sinks, zero
    /// elsewhere. Balanced by construction.
    pub fn net_supplies(&self, node_count: usize) -> Vec<i64> {
        let mut supplies = vec![0i64; node_count];
        for entry in &self.entries {
            supplies[entry.source.get()] += entry.quantity as i64;
            supplies[entry.sink.get()] -= entry.quantity as i64;
        }
        supplies
    }

    /// Distinct source nodes, ascending.
    pub fn sources(&self) -> Vec<NodeIdx> {
        let mut sources: Vec<NodeIdx> = self.entries.iter().map(DemandEntry::source).collect();
        sources.sort();
        sources.dedup();
        sources
    }

    /// Distinct sink nodes, ascending.
    pub fn sinks(&self) -> Vec<NodeIdx> {
        let mut sinks: Vec<NodeIdx> = self.entries.iter().map(DemandEntry::sink).collect();
        sinks.sort();
        sinks.dedup();
        sinks
    }

    /// Expand to individual trips, stably sorted by departure time.
    pub fn trips(&self) -> Vec<Trip> {
        let mut trips = Vec::with_capacity(self.total_units() as usize);
        for entry in &self.entries {
            for _ in 0..entry.quantity {
                trips.push(Trip {
                    departure: entry.departure,
                    vehicle_class: entry.vehicle_class.clone(),
                    source: entry.source,
                    sink: entry.sink,
                });
            }
        }
        trips.sort_by(|a, b| a.departure.total_cmp(&b.departure));
        trips
    }
}

/// Parse the source/sink pair file and the positionally aligned
/// departure-time file. A single pair line broadcasts over all departures.
pub fn parse_demand(
    pairs_text: &str,
    departures_text: &str,
    graph: &Graph,
    vehicle_class: &str,
) -> Result<Demand, FlowError> {
    let mut pairs = Vec::new();
    for (i, line) in pairs_text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(source), Some(sink)) = (fields.next(), fields.next()) else {
            return Err(FlowError::MalformedDemand {
                line: i + 1,
                message: format!("expected `source sink`, found {line:?}"),
            });
        };
        let source = graph
            .node_by_name(source)
            .ok_or_else(|| FlowError::UnknownNode {
                name: source.to_string(),
            })?;
        let sink = graph
            .node_by_name(sink)
            .ok_or_else(|| FlowError::UnknownNode {
                name: sink.to_string(),
            })?;
        pairs.push((source, sink));
    }

    let mut departures = Vec::new();
    for (i, line) in departures_text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let departure: f64 = line.parse().map_err(|_| FlowError::MalformedDemand {
            line: i + 1,
            message: format!("not a departure time: {line}"),
        })?;
        departures.push(departure);
    }

    if pairs.len() == 1 && departures.len() > 1 {
        let only = pairs[0];
        pairs = vec![only; departures.len()];
    }
    if pairs.len() != departures.len() {
        return Err(FlowError::MisalignedDemand {
            pairs: pairs.len(),
            departures: departures.len(),
        });
    }

    let entries = pairs
        .into_iter()
        .zip(departures)
        .map(|((source, sink), departure)| {
            DemandEntry::new(1, departure, vehicle_class, source, sink)
        })
        .collect();
    Ok(Demand::new(entries))
}

pub fn load_demand(
    graph: &Graph,
    pairs_path: &Path,
    departures_path: &Path,
    vehicle_class: &str,
) -> anyhow::Result<Demand> {
    let pairs = std::fs::read_to_string(pairs_path)
        .with_context(|| format!("reading source/sink pairs {}", pairs_path.display()))?;
    let departures = std::fs::read_to_string(departures_path)
        .with_context(|| format!("reading departures {}", departures_path.display()))?;
    parse_demand(&pairs, &departures, graph, vehicle_class)
        .with_context(|| format!("parsing demand {}", pairs_path.display()))
}
