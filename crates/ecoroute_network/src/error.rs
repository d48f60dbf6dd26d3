use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("edge {edge} references junction {junction} with no positional record")]
    MissingJunction { edge: String, junction: String },

    #[error("turning movement references unknown edge {edge}")]
    UnknownEdge { edge: String },

    #[error("turning movement {from_edge} -> {to_edge} does not meet at a junction")]
    InvalidMovement { from_edge: String, to_edge: String },

    #[error("duplicate link id {id}")]
    DuplicateLink { id: String },

    #[error("links {first} and {second} both join {from} -> {to}")]
    DuplicateArc {
        first: String,
        second: String,
        from: String,
        to: String,
    },

    #[error("unknown node {name}")]
    UnknownNode { name: String },

    #[error("missing column {column} in header")]
    MissingColumn { column: String },

    #[error("line {line}: {message}")]
    MalformedRow { line: usize, message: String },

    #[error("no road link joins junctions {from} and {to}")]
    UnknownJunctionPair { from: String, to: String },

    #[error("more than one road link joins junctions {from} and {to}")]
    AmbiguousJunctionPair { from: String, to: String },

    #[error("no direct or via link joins {from} to {to}")]
    UnconnectedPair { from: String, to: String },
}
