use std::path::Path;

use anyhow::Context;
use fxhash::FxHashMap;
use tracing::debug;

use crate::capacity::CapacityPolicy;
use crate::error::NetworkError;
use crate::graph::{Graph, GraphBuilder, LinkSpec};
use crate::link::LinkKind;
use crate::node::{NodeName, Position};

/// One row of the static link table (`link nlanes from to maxspeed length`).
#[derive(Debug)]
pub struct StaticRow {
    pub link: String,
    pub lanes: u32,
    pub from: String,
    pub to: String,
    pub max_speed: f64,
    pub length: f64,
}

/// One row of the measured-cost table
/// (`link ttime avgspeed ... cost_<metric>...`).
#[derive(Debug)]
pub struct CostRow {
    pub link: String,
    pub travel_time: f64,
    pub measured_speed: f64,
    pub costs: Vec<f64>,
}

struct Header<'a> {
    names: Vec<&'a str>,
}

impl<'a> Header<'a> {
    fn parse(line: &'a str) -> Header<'a> {
        Header {
            names: line.split_whitespace().collect(),
        }
    }

    fn column(&self, name: &str) -> Result<usize, NetworkError> {
        self.names
            .iter()
            .position(|&n| n == name)
            .ok_or_else(|| NetworkError::MissingColumn {
                column: name.to_string(),
            })
    }

    fn columns_with_prefix(&self, prefix: &str) -> Vec<(usize, &'a str)> {
        self.names
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(prefix))
            .map(|(i, &name)| (i, name))
            .collect()
    }
}

fn rows(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.split_whitespace().collect()))
}

fn field<'a>(row: &[&'a str], index: usize, line: usize) -> Result<&'a str, NetworkError> {
    row.get(index).copied().ok_or(NetworkError::MalformedRow {
        line,
        message: format!("expected at least {} fields, found {}", index + 1, row.len()),
    })
}

fn number(value: &str, line: usize) -> Result<f64, NetworkError> {
    value.parse().map_err(|_| NetworkError::MalformedRow {
        line,
        message: format!("not a number: {value}"),
    })
}

pub fn parse_static_table(text: &str) -> Result<Vec<StaticRow>, NetworkError> {
    let header = Header::parse(text.lines().next().unwrap_or(""));
    let link = header.column("link")?;
    let lanes = header.column("nlanes")?;
    let from = header.column("from")?;
    let to = header.column("to")?;
    let max_speed = header.column("maxspeed")?;
    let length = header.column("length")?;

    let mut out = Vec::new();
    for (line, row) in rows(text) {
        out.push(StaticRow {
            link: field(&row, link, line)?.to_string(),
            lanes: number(field(&row, lanes, line)?, line)?.round() as u32,
            from: field(&row, from, line)?.to_string(),
            to: field(&row, to, line)?.to_string(),
            max_speed: number(field(&row, max_speed, line)?, line)?,
            length: number(field(&row, length, line)?, line)?,
        });
    }
    Ok(out)
}

/// Returns the named cost labels (header order) and the parsed rows; each
/// row's `costs` aligns with the labels.
pub fn parse_cost_table(text: &str) -> Result<(Vec<String>, Vec<CostRow>), NetworkError> {
    let header = Header::parse(text.lines().next().unwrap_or(""));
    let link = header.column("link")?;
    let travel_time = header.column("ttime")?;
    let measured_speed = header.column("avgspeed")?;
    let cost_columns = header.columns_with_prefix("cost");
    let labels: Vec<String> = cost_columns.iter().map(|(_, n)| n.to_string()).collect();

    let mut out = Vec::new();
    for (line, row) in rows(text) {
        let mut costs = Vec::with_capacity(cost_columns.len());
        for &(index, _) in &cost_columns {
            costs.push(number(field(&row, index, line)?, line)?);
        }
        out.push(CostRow {
            link: field(&row, link, line)?.to_string(),
            travel_time: number(field(&row, travel_time, line)?, line)?,
            measured_speed: number(field(&row, measured_speed, line)?, line)?,
            costs,
        });
    }
    Ok((labels, out))
}

/// Positions table (`node_id x y`), keyed by node spelling.
pub fn parse_positions(text: &str) -> Result<FxHashMap<String, Position>, NetworkError> {
    let header = Header::parse(text.lines().next().unwrap_or(""));
    let node = header.column("node_id")?;
    let x = header.column("x")?;
    let y = header.column("y")?;

    let mut out = FxHashMap::default();
    for (line, row) in rows(text) {
        out.insert(
            field(&row, node, line)?.to_string(),
            Position {
                x: number(field(&row, x, line)?, line)?,
                y: number(field(&row, y, line)?, line)?,
            },
        );
    }
    Ok(out)
}

/// Build a graph from static rows. Node spellings are parsed into
/// [`NodeName`]s here and nowhere else downstream.
pub fn build_graph(
    rows: &[StaticRow],
    positions: &FxHashMap<String, Position>,
    policy: &CapacityPolicy,
) -> Result<Graph, NetworkError> {
    let mut builder = GraphBuilder::new();
    for row in rows {
        let kind = if row.link.starts_with("J-") {
            LinkKind::Via
        } else {
            LinkKind::Road
        };
        builder.add_link(LinkSpec {
            id: row.link.clone(),
            from: row.from.clone(),
            to: row.to.clone(),
            kind,
            lanes: row.lanes,
            length: row.length,
            speed: row.max_speed,
        })?;
    }
    for (spelling, position) in positions {
        builder.add_node(NodeName::parse(spelling), Some(*position));
    }
    Ok(builder.build(policy))
}

/// Merge measured costs onto the graph and rederive capacities.
///
/// Rows are matched by exact link id; via links fall back to their junction
/// aggregate row (`J-<junction>`). Links with no row keep zero named costs,
/// free-flow travel time and the posted speed as measured speed.
pub fn apply_costs(
    graph: &mut Graph,
    labels: &[String],
    rows: &[CostRow],
    policy: &CapacityPolicy,
) {
    let by_id: FxHashMap<&str, &CostRow> = rows.iter().map(|r| (r.link.as_str(), r)).collect();

    for index in 0..graph.link_count() {
        let idx = crate::link::LinkIdx::new(index);
        let (external_id, is_via) = {
            let link = graph.link(idx);
            (link.external_id().to_string(), link.is_via())
        };
        let row = by_id.get(external_id.as_str()).copied().or_else(|| {
            if is_via {
                external_id
                    .rsplit_once('-')
                    .and_then(|(aggregate, _)| by_id.get(aggregate).copied())
            } else {
                None
            }
        });
        match row {
            Some(row) => {
                let link = graph.link_mut(idx);
                link.set_measured(row.measured_speed, row.travel_time);
                for (label, &value) in labels.iter().zip(&row.costs) {
                    link.set_named_cost(label, value);
                }
            }
            None => {
                debug!(link = %external_id, "no measured costs, assuming free flow");
                let link = graph.link_mut(idx);
                let posted = link.posted_speed();
                let free_flow = link.free_flow_time();
                link.set_measured(posted, free_flow);
                for label in labels {
                    link.set_named_cost(label, 0.0);
                }
            }
        }
    }
    graph.set_capacities(policy);
}

/// Load a graph from the static link table, the measured-cost table and an
/// optional node-position table.
pub fn load_network(
    static_path: &Path,
    costs_path: &Path,
    positions_path: Option<&Path>,
    policy: &CapacityPolicy,
) -> anyhow::Result<Graph> {
    let static_text = std::fs::read_to_string(static_path)
        .with_context(|| format!("reading link table {}", static_path.display()))?;
    let static_rows = parse_static_table(&static_text)
        .with_context(|| format!("parsing link table {}", static_path.display()))?;

    let positions = match positions_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading node positions {}", path.display()))?;
            parse_positions(&text)
                .with_context(|| format!("parsing node positions {}", path.display()))?
        }
        None => FxHashMap::default(),
    };

    let mut graph = build_graph(&static_rows, &positions, policy)?;

    let costs_text = std::fs::read_to_string(costs_path)
        .with_context(|| format!("reading cost table {}", costs_path.display()))?;
    let (labels, cost_rows) = parse_cost_table(&costs_text)
        .with_context(|| format!("parsing cost table {}", costs_path.display()))?;
    apply_costs(&mut graph, &labels, &cost_rows, policy);

    Ok(graph)
}
