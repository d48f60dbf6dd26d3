use serde::Serialize;
use tracing::debug;

use ecoroute_network::graph::Graph;
use ecoroute_network::link::LinkIdx;
use ecoroute_network::node::NodeIdx;

use crate::demand::Demand;
use crate::error::FlowError;
use crate::flow::Flow;

/// One objective row: a cost label weighted into the linear combination.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    label: String,
    weight: i64,
}

impl Objective {
    pub fn new(label: impl Into<String>, weight: i64) -> Objective {
        Objective {
            label: label.into(),
            weight,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn weight(&self) -> i64 {
        self.weight
    }
}

/// Whether the solver should enumerate the whole Pareto front or only its
/// extremal (supported) points, which is considerably cheaper.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontMode {
    Full,
    ExtremalOnly,
}

/// One column of the problem: an arc with its bound and per-objective
/// integer cost coefficients.
#[derive(Serialize, Debug, Clone)]
pub struct ProblemArc {
    id: String,
    link: LinkIdx,
    from: NodeIdx,
    to: NodeIdx,
    capacity: u64,
    costs: Vec<i64>,
}

impl ProblemArc {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn link(&self) -> LinkIdx {
        self.link
    }

    pub fn from(&self) -> NodeIdx {
        self.from
    }

    pub fn to(&self) -> NodeIdx {
        self.to
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn costs(&self) -> &[i64] {
        &self.costs
    }
}

/// Self-contained snapshot of one multi-objective minimum-cost-flow problem,
/// ready for serialization to a solver backend. Holds no graph borrow.
#[derive(Serialize, Debug, Clone)]
pub struct FlowProblem {
    name: String,
    objectives: Vec<Objective>,
    node_names: Vec<String>,
    arcs: Vec<ProblemArc>,
    supplies: Vec<i64>,
    mode: FrontMode,
}

impl FlowProblem {
    pub fn builder<'a>(graph: &'a Graph) -> FlowProblemBuilder<'a> {
        FlowProblemBuilder {
            graph,
            name: "moProblem".to_string(),
            demand: None,
            objectives: Vec::new(),
            mode: FrontMode::Full,
            capacity_override: None,
            background: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn node_names(&self) -> &[String] {
        &self.node_names
    }

    pub fn node_name(&self, node: NodeIdx) -> &str {
        self.node_names
            .get(node.get())
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn arcs(&self) -> &[ProblemArc] {
        &self.arcs
    }

    pub fn supplies(&self) -> &[i64] {
        &self.supplies
    }

    pub fn mode(&self) -> FrontMode {
        self.mode
    }
}

pub struct FlowProblemBuilder<'a> {
    graph: &'a Graph,
    name: String,
    demand: Option<&'a Demand>,
    objectives: Vec<Objective>,
    mode: FrontMode,
    capacity_override: Option<u64>,
    background: Option<&'a Flow>,
}

impl<'a> FlowProblemBuilder<'a> {
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut FlowProblemBuilder<'a> {
        self.name = name.into();
        self
    }

    pub fn set_demand(&mut self, demand: &'a Demand) -> &mut FlowProblemBuilder<'a> {
        self.demand = Some(demand);
        self
    }

    pub fn add_objective(&mut self, objective: Objective) -> &mut FlowProblemBuilder<'a> {
        self.objectives.push(objective);
        self
    }

    pub fn set_objectives(&mut self, objectives: Vec<Objective>) -> &mut FlowProblemBuilder<'a> {
        self.objectives = objectives;
        self
    }

    pub fn set_front_mode(&mut self, mode: FrontMode) -> &mut FlowProblemBuilder<'a> {
        self.mode = mode;
        self
    }

    /// Replace every arc's capacity with a uniform bound; takes precedence
    /// over background-flow reduction.
    pub fn set_capacity_override(&mut self, capacity: u64) -> &mut FlowProblemBuilder<'a> {
        self.capacity_override = Some(capacity);
        self
    }

    /// Reduce each arc's capacity by a previously computed background flow,
    /// clipped at zero.
    pub fn set_background_flow(&mut self, background: &'a Flow) -> &mut FlowProblemBuilder<'a> {
        self.background = Some(background);
        self
    }

    pub fn build(&self) -> Result<FlowProblem, FlowError> {
        let demand = self.demand.expect("demand is required");
        let supplies = demand.net_supplies(self.graph.node_count());

        let mut arcs = Vec::with_capacity(self.graph.link_count());
        for (idx, link) in self.graph.links() {
            let mut costs = Vec::with_capacity(self.objectives.len());
            for objective in &self.objectives {
                let per_unit =
                    link.cost(objective.label())
                        .ok_or_else(|| FlowError::UnknownCostLabel {
                            label: objective.label().to_string(),
                        })?;
                costs.push((objective.weight() as f64 * per_unit).round() as i64);
            }
            let capacity = match self.capacity_override {
                Some(capacity) => capacity,
                None => match self.background {
                    Some(background) => link
                        .capacity()
                        .saturating_sub(background.units(link.from(), link.to())),
                    None => link.capacity(),
                },
            };
            arcs.push(ProblemArc {
                id: link.external_id().to_string(),
                link: idx,
                from: link.from(),
                to: link.to(),
                capacity,
                costs,
            });
        }

        let node_names = self
            .graph
            .nodes()
            .map(|(_, node)| node.name().to_string())
            .collect();

        debug!(
            name = %self.name,
            arcs = arcs.len(),
            objectives = self.objectives.len(),
            "formulated flow problem"
        );
        Ok(FlowProblem {
            name: self.name.clone(),
            objectives: self.objectives.clone(),
            node_names,
            arcs,
            supplies,
            mode: self.mode,
        })
    }
}
