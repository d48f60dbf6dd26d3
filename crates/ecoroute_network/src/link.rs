use std::collections::BTreeMap;

use serde::Serialize;

use crate::define_index_newtype;
use crate::node::NodeIdx;

define_index_newtype!(LinkIdx, Link);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// A physical road segment.
    Road,
    /// A synthetic turn connector minted by junction expansion. Carries zero
    /// length and the conventional high reference speed, and is filtered out
    /// when a route is projected back onto physical segments.
    Via,
}

#[derive(Serialize, Debug, Clone)]
pub struct Link {
    external_id: String,
    from: NodeIdx,
    to: NodeIdx,
    kind: LinkKind,
    lanes: u32,
    length: f64,
    posted_speed: f64,
    measured_speed: f64,
    travel_time: f64,
    capacity: u64,
    costs: BTreeMap<String, f64>,
}

impl Link {
    pub(crate) fn new(
        external_id: String,
        from: NodeIdx,
        to: NodeIdx,
        kind: LinkKind,
        lanes: u32,
        length: f64,
        posted_speed: f64,
    ) -> Link {
        Link {
            external_id,
            from,
            to,
            kind,
            lanes,
            length,
            posted_speed,
            measured_speed: 0.0,
            travel_time: 0.0,
            capacity: 0,
            costs: BTreeMap::new(),
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn from(&self) -> NodeIdx {
        self.from
    }

    pub fn to(&self) -> NodeIdx {
        self.to
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    pub fn is_via(&self) -> bool {
        self.kind == LinkKind::Via
    }

    pub fn lanes(&self) -> u32 {
        self.lanes
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn posted_speed(&self) -> f64 {
        self.posted_speed
    }

    pub fn measured_speed(&self) -> f64 {
        self.measured_speed
    }

    pub fn travel_time(&self) -> f64 {
        self.travel_time
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn free_flow_time(&self) -> f64 {
        if self.posted_speed > 0.0 {
            self.length / self.posted_speed
        } else {
            0.0
        }
    }

    /// A link is free-flowing when the measured speed matches the posted one.
    pub fn is_free_flowing(&self) -> bool {
        self.measured_speed == self.posted_speed
    }

    /// Named per-unit costs (`cost_*` labels from the measured table).
    pub fn named_costs(&self) -> &BTreeMap<String, f64> {
        &self.costs
    }

    /// Per-unit cost under a label: the built-in `length`/`ttime` labels or
    /// one of the named costs.
    pub fn cost(&self, label: &str) -> Option<f64> {
        match label {
            "length" => Some(self.length),
            "ttime" => Some(self.travel_time),
            _ => self.costs.get(label).copied(),
        }
    }

    pub(crate) fn set_capacity(&mut self, capacity: u64) {
        self.capacity = capacity;
    }

    pub(crate) fn set_measured(&mut self, measured_speed: f64, travel_time: f64) {
        self.measured_speed = measured_speed;
        self.travel_time = travel_time;
    }

    pub(crate) fn set_named_cost(&mut self, label: &str, value: f64) {
        self.costs.insert(label.to_string(), value);
    }
}
