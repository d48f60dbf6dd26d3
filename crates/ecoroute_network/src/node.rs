use std::fmt::Display;

use serde::Serialize;

use crate::define_index_newtype;

define_index_newtype!(NodeIdx, Node);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnSide {
    In,
    Out,
}

/// Node identity, decided once when the graph is built. Turn nodes are the
/// per-movement slots minted by junction expansion; everything else keeps its
/// raw identifier.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeName {
    Physical(String),
    Turn {
        junction: String,
        slot: u32,
        side: TurnSide,
    },
}

impl NodeName {
    pub fn physical(id: impl Into<String>) -> NodeName {
        NodeName::Physical(id.into())
    }

    pub fn turn(junction: impl Into<String>, slot: u32, side: TurnSide) -> NodeName {
        NodeName::Turn {
            junction: junction.into(),
            slot,
            side,
        }
    }

    /// The only place a node spelling is inspected. `<junction>-<slot>In` and
    /// `<junction>-<slot>Out` are reserved for turn nodes; anything else is a
    /// physical identifier.
    pub fn parse(spelling: &str) -> NodeName {
        for (suffix, side) in [("In", TurnSide::In), ("Out", TurnSide::Out)] {
            if let Some(stem) = spelling.strip_suffix(suffix) {
                if let Some((junction, digits)) = stem.rsplit_once('-') {
                    if !junction.is_empty()
                        && !digits.is_empty()
                        && digits.chars().all(|c| c.is_ascii_digit())
                    {
                        if let Ok(slot) = digits.parse() {
                            return NodeName::Turn {
                                junction: junction.to_string(),
                                slot,
                                side,
                            };
                        }
                    }
                }
            }
        }
        NodeName::Physical(spelling.to_string())
    }

    /// Junction this node belongs to; for physical nodes the identifier
    /// itself.
    pub fn junction(&self) -> &str {
        match self {
            NodeName::Physical(id) => id,
            NodeName::Turn { junction, .. } => junction,
        }
    }

    pub fn is_turn(&self) -> bool {
        matches!(self, NodeName::Turn { .. })
    }
}

impl Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeName::Physical(id) => write!(f, "{id}"),
            NodeName::Turn {
                junction,
                slot,
                side,
            } => {
                let side = match side {
                    TurnSide::In => "In",
                    TurnSide::Out => "Out",
                };
                write!(f, "{junction}-{slot}{side}")
            }
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Debug, Clone)]
pub struct Node {
    name: NodeName,
    position: Option<Position>,
}

impl Node {
    pub fn new(name: NodeName, position: Option<Position>) -> Node {
        Node { name, position }
    }

    pub fn name(&self) -> &NodeName {
        &self.name
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = Some(position);
    }
}
