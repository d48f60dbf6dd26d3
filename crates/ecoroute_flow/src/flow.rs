use std::collections::BTreeMap;

use serde::Serialize;

use ecoroute_network::graph::Graph;
use ecoroute_network::link::LinkIdx;
use ecoroute_network::node::NodeIdx;

/// Aggregate vehicle counts per arc. Only nonzero entries are stored;
/// `BTreeMap` keeps iteration deterministic.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Flow {
    units: BTreeMap<NodeIdx, BTreeMap<NodeIdx, u64>>,
}

impl Flow {
    pub fn new() -> Flow {
        Flow::default()
    }

    pub fn units(&self, from: NodeIdx, to: NodeIdx) -> u64 {
        self.units
            .get(&from)
            .and_then(|heads| heads.get(&to))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_units(&mut self, from: NodeIdx, to: NodeIdx, units: u64) {
        if units == 0 {
            if let Some(heads) = self.units.get_mut(&from) {
                heads.remove(&to);
                if heads.is_empty() {
                    self.units.remove(&from);
                }
            }
        } else {
            self.units.entry(from).or_default().insert(to, units);
        }
    }

    pub fn add_units(&mut self, from: NodeIdx, to: NodeIdx, units: u64) {
        if units > 0 {
            *self.units.entry(from).or_default().entry(to).or_insert(0) += units;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn total_units(&self) -> u64 {
        self.entries().map(|(_, _, units)| units).sum()
    }

    /// Nonzero entries in (from, to) order.
    pub fn entries(&self) -> impl Iterator<Item = (NodeIdx, NodeIdx, u64)> + '_ {
        self.units.iter().flat_map(|(&from, heads)| {
            heads.iter().map(move |(&to, &units)| (from, to, units))
        })
    }

    /// Outgoing minus incoming units per node.
    pub fn node_balance(&self, node_count: usize) -> Vec<i64> {
        let mut balance = vec![0i64; node_count];
        for (from, to, units) in self.entries() {
            balance[from.get()] += units as i64;
            balance[to.get()] -= units as i64;
        }
        balance
    }

    /// Aggregate fixed route assignments into a background flow: route `i`
    /// contributes `counts[i]` units on each of its links.
    pub fn from_route_counts(graph: &Graph, routes: &[Vec<LinkIdx>], counts: &[u64]) -> Flow {
        let mut flow = Flow::new();
        for (route, &count) in routes.iter().zip(counts) {
            if count == 0 {
                continue;
            }
            for &link in route {
                let link = graph.link(link);
                flow.add_units(link.from(), link.to(), count);
            }
        }
        flow
    }
}
