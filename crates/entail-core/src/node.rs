//! Node and term kinds for the semantic network.

use crate::Relation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node. Ids are dense and assigned in insertion order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The id as a plain index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A labeled argument arc of a molecular node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    /// The relation label.
    pub relation: Relation,
    /// The node at the far end.
    pub target: NodeId,
}

impl Wire {
    /// Create a new wire.
    pub fn new(relation: impl Into<Relation>, target: NodeId) -> Self {
        Self {
            relation: relation.into(),
            target,
        }
    }
}

/// The kind of a rule node, with its firing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// Fires positively once every antecedent supports it; negatively on the
    /// first refuting antecedent.
    AndEntailment,
    /// Fires positively on the first supporting antecedent; negatively once
    /// every antecedent refutes it.
    OrEntailment,
    /// Fires positively while the positive-support count lies in `[min, max]`;
    /// negatively once `min` is unreachable.
    Numerical { min: u32, max: u32 },
    /// A threshold rule with min = 1 over all antecedents.
    Implication,
}

/// The antecedent/consequent anatomy of a rule node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// The rule kind with its parameters.
    pub kind: RuleKind,
    /// Antecedent nodes, in definition order.
    pub antecedents: Vec<NodeId>,
    /// Consequent nodes, in definition order.
    pub consequents: Vec<NodeId>,
}

/// The kind-specific payload of a node.
///
/// A tagged union rather than a class hierarchy: every node is exactly one of
/// these, and all kind-specific behavior dispatches on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// An individual constant or an atomic proposition.
    Base,
    /// A pattern variable.
    Variable,
    /// A composite proposition or pattern built from labeled wires.
    Molecular { wires: Vec<Wire> },
    /// A rule proposition.
    Rule(RuleSpec),
}

/// A vertex of the semantic network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Unique human-readable name.
    pub name: String,
    /// Kind-specific payload.
    pub kind: NodeKind,
}

impl Node {
    /// Whether this node is a constant for antecedent classification.
    ///
    /// A node is constant iff it is not a composite term, or it is itself a
    /// variable node; composite terms are variable-bearing regardless of
    /// whether any free variable remains.
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Base | NodeKind::Variable)
    }

    /// Whether this node is a pattern variable.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, NodeKind::Variable)
    }

    /// Whether this node is a rule node.
    pub fn is_rule(&self) -> bool {
        matches!(self.kind, NodeKind::Rule(_))
    }

    /// The rule spec, if this node is a rule.
    pub fn rule_spec(&self) -> Option<&RuleSpec> {
        match &self.kind {
            NodeKind::Rule(spec) => Some(spec),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
