use std::collections::{BTreeSet, VecDeque};

use fxhash::FxHashMap;

use crate::capacity::CapacityPolicy;
use crate::error::NetworkError;
use crate::link::{Link, LinkIdx, LinkKind};
use crate::node::{Node, NodeIdx, NodeName, Position};

/// Directed flow graph. Owns all nodes and links; read-only once built, so a
/// shared instance can back any number of optimization runs.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    links: Vec<Link>,
    /// Outgoing links per node, in link-insertion order. This ordering is
    /// load-bearing: decomposition scans it as its deterministic tie-break.
    outgoing: Vec<Vec<LinkIdx>>,
    names: FxHashMap<String, NodeIdx>,
    ids: FxHashMap<String, LinkIdx>,
    between: FxHashMap<(NodeIdx, NodeIdx), LinkIdx>,
    junction_pairs: FxHashMap<(String, String), Vec<LinkIdx>>,
}

impl Graph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx]
    }

    pub fn link(&self, idx: LinkIdx) -> &Link {
        &self.links[idx]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIdx::new(i), node))
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkIdx, &Link)> {
        self.links
            .iter()
            .enumerate()
            .map(|(i, link)| (LinkIdx::new(i), link))
    }

    pub fn node_by_name(&self, spelling: &str) -> Option<NodeIdx> {
        self.names.get(spelling).copied()
    }

    pub fn link_by_id(&self, external_id: &str) -> Option<LinkIdx> {
        self.ids.get(external_id).copied()
    }

    pub fn outgoing(&self, node: NodeIdx) -> &[LinkIdx] {
        &self.outgoing[node.get()]
    }

    /// The unique link from `a` to `b`, if one exists.
    pub fn link_between(&self, a: NodeIdx, b: NodeIdx) -> Option<LinkIdx> {
        self.between.get(&(a, b)).copied()
    }

    /// Named cost labels present on any link, sorted.
    pub fn cost_labels(&self) -> Vec<String> {
        let labels: BTreeSet<&str> = self
            .links
            .iter()
            .flat_map(|link| link.named_costs().keys().map(String::as_str))
            .collect();
        labels.into_iter().map(str::to_string).collect()
    }

    /// Labels an evaluation reports: every named cost plus the built-in
    /// `length` and `ttime` metrics.
    pub fn evaluation_labels(&self) -> Vec<String> {
        let mut labels = self.cost_labels();
        labels.push("length".to_string());
        labels.push("ttime".to_string());
        labels
    }

    /// Recompute every link's capacity under `policy`. Called after
    /// construction and again whenever measured speeds change.
    pub fn set_capacities(&mut self, policy: &CapacityPolicy) {
        for link in &mut self.links {
            let capacity = policy.capacity(link);
            link.set_capacity(capacity);
        }
    }

    /// Nodes reachable from any of `starts` along directed links.
    pub fn reachable_from(&self, starts: &[NodeIdx]) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue: VecDeque<NodeIdx> = VecDeque::new();
        for &start in starts {
            if !seen[start.get()] {
                seen[start.get()] = true;
                queue.push_back(start);
            }
        }
        while let Some(node) = queue.pop_front() {
            for &link in self.outgoing(node) {
                let next = self.links[link].to();
                if !seen[next.get()] {
                    seen[next.get()] = true;
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Reconcile a junction-spelled path (the spelling used by pre-expansion
    /// route files) into this graph's link sequence. Each consecutive
    /// junction pair must resolve to exactly one road link, and consecutive
    /// road links must meet directly or through exactly one via link.
    pub fn resolve_junction_path(&self, junctions: &[&str]) -> Result<Vec<LinkIdx>, NetworkError> {
        let mut roads = Vec::with_capacity(junctions.len().saturating_sub(1));
        for pair in junctions.windows(2) {
            let key = (pair[0].to_string(), pair[1].to_string());
            let candidates = self
                .junction_pairs
                .get(&key)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            match candidates {
                [] => {
                    return Err(NetworkError::UnknownJunctionPair {
                        from: pair[0].to_string(),
                        to: pair[1].to_string(),
                    });
                }
                [link] => roads.push(*link),
                _ => {
                    return Err(NetworkError::AmbiguousJunctionPair {
                        from: pair[0].to_string(),
                        to: pair[1].to_string(),
                    });
                }
            }
        }

        let mut path = Vec::with_capacity(roads.len() * 2);
        for (i, &road) in roads.iter().enumerate() {
            if i > 0 {
                let prev_head = self.links[roads[i - 1]].to();
                let tail = self.links[road].from();
                if prev_head != tail {
                    let via = self.link_between(prev_head, tail).ok_or_else(|| {
                        NetworkError::UnconnectedPair {
                            from: self.nodes[prev_head].name().to_string(),
                            to: self.nodes[tail].name().to_string(),
                        }
                    })?;
                    path.push(via);
                }
            }
            path.push(road);
        }
        Ok(path)
    }
}

/// Spec of one link for [`GraphBuilder::add_link`]; endpoints are node
/// spellings, interned (and parsed into [`NodeName`]s) on insertion.
pub struct LinkSpec {
    pub id: String,
    pub from: String,
    pub to: String,
    pub kind: LinkKind,
    pub lanes: u32,
    pub length: f64,
    pub speed: f64,
}

#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
    outgoing: Vec<Vec<LinkIdx>>,
    names: FxHashMap<String, NodeIdx>,
    ids: FxHashMap<String, LinkIdx>,
    between: FxHashMap<(NodeIdx, NodeIdx), LinkIdx>,
}

impl GraphBuilder {
    pub fn new() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// Intern a node, updating its position when one is supplied.
    pub fn add_node(&mut self, name: NodeName, position: Option<Position>) -> NodeIdx {
        let spelling = name.to_string();
        if let Some(&idx) = self.names.get(&spelling) {
            if let Some(position) = position {
                self.nodes[idx].set_position(position);
            }
            return idx;
        }
        let idx = NodeIdx::new(self.nodes.len());
        self.nodes.push(Node::new(name, position));
        self.outgoing.push(Vec::new());
        self.names.insert(spelling, idx);
        idx
    }

    /// Intern a node by spelling alone.
    pub fn node(&mut self, spelling: &str) -> NodeIdx {
        if let Some(&idx) = self.names.get(spelling) {
            return idx;
        }
        self.add_node(NodeName::parse(spelling), None)
    }

    pub fn add_link(&mut self, spec: LinkSpec) -> Result<LinkIdx, NetworkError> {
        let from = self.node(&spec.from);
        let to = self.node(&spec.to);
        self.add_link_between(spec.id, from, to, spec.kind, spec.lanes, spec.length, spec.speed)
    }

    pub fn add_link_between(
        &mut self,
        id: String,
        from: NodeIdx,
        to: NodeIdx,
        kind: LinkKind,
        lanes: u32,
        length: f64,
        speed: f64,
    ) -> Result<LinkIdx, NetworkError> {
        if self.ids.contains_key(&id) {
            return Err(NetworkError::DuplicateLink { id });
        }
        if let Some(&existing) = self.between.get(&(from, to)) {
            return Err(NetworkError::DuplicateArc {
                first: self.links[existing].external_id().to_string(),
                second: id,
                from: self.nodes[from].name().to_string(),
                to: self.nodes[to].name().to_string(),
            });
        }
        let idx = LinkIdx::new(self.links.len());
        self.links
            .push(Link::new(id.clone(), from, to, kind, lanes, length, speed));
        self.outgoing[from.get()].push(idx);
        self.ids.insert(id, idx);
        self.between.insert((from, to), idx);
        Ok(idx)
    }

    pub fn build(self, policy: &CapacityPolicy) -> Graph {
        let mut junction_pairs: FxHashMap<(String, String), Vec<LinkIdx>> = FxHashMap::default();
        for (i, link) in self.links.iter().enumerate() {
            let key = (
                self.nodes[link.from()].name().junction().to_string(),
                self.nodes[link.to()].name().junction().to_string(),
            );
            junction_pairs.entry(key).or_default().push(LinkIdx::new(i));
        }
        let mut graph = Graph {
            nodes: self.nodes,
            links: self.links,
            outgoing: self.outgoing,
            names: self.names,
            ids: self.ids,
            between: self.between,
            junction_pairs,
        };
        graph.set_capacities(policy);
        graph
    }
}

impl Graph {
    pub(crate) fn link_mut(&mut self, idx: LinkIdx) -> &mut Link {
        &mut self.links[idx]
    }
}
