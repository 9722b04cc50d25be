use thiserror::Error;

/// Errors that can occur while building or reading the network.
#[derive(Error, Debug)]
pub enum Error {
    /// A node with this name already exists.
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),
    /// No node with this id.
    #[error("unknown node: {0}")]
    UnknownNode(crate::NodeId),
    /// No node with this name.
    #[error("unknown node name: {0}")]
    UnknownNodeName(String),
    /// The node exists but is not a rule node.
    #[error("node {0} is not a rule node")]
    NotARule(crate::NodeId),
    /// A rule or case-frame definition is malformed.
    #[error("invalid rule definition: {0}")]
    InvalidRule(String),
    /// Context name lookup missed; operating on a null context is forbidden.
    #[error("unknown context: {0}")]
    UnknownContext(String),
}

/// Result type alias for entail-core.
pub type Result<T> = std::result::Result<T, Error>;
