//! Belief-propagation messages.

use entail_core::{NodeId, Substitution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Whether a message supports or refutes a proposition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Polarity {
    /// The proposition holds.
    Positive,
    /// The proposition is refuted.
    Negative,
}

impl Polarity {
    /// Flip the polarity.
    pub fn negate(self) -> Self {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Positive => write!(f, "+"),
            Polarity::Negative => write!(f, "-"),
        }
    }
}

/// The hypotheses justifying a belief.
pub type SupportSet = BTreeSet<NodeId>;

/// A signed belief message, delivered forward along a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// The name of the context the belief is scoped to. Resolved, and
    /// validated, by the receiving rule handler.
    pub context: String,
    /// Supports or refutes.
    pub polarity: Polarity,
    /// The variable bindings this belief instance carries.
    pub substitution: Substitution,
    /// The justification set.
    pub supports: SupportSet,
    /// The node this report originates from.
    pub reporter: NodeId,
}

impl Report {
    /// Create a new report.
    pub fn new(
        context: impl Into<String>,
        polarity: Polarity,
        substitution: Substitution,
        supports: SupportSet,
        reporter: NodeId,
    ) -> Self {
        Self {
            context: context.into(),
            polarity,
            substitution,
            supports,
            reporter,
        }
    }

    /// Whether this report supports its proposition.
    pub fn is_positive(&self) -> bool {
        self.polarity == Polarity::Positive
    }
}

/// A backward-chaining message asking a node to attempt to derive support
/// for a pattern, delivered backward along a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    /// The name of the context the derivation is wanted in.
    pub context: String,
    /// The bindings the requester is interested in. Variables the filter
    /// leaves unbound are wildcards.
    pub filter: Substitution,
    /// The node asking.
    pub requester: NodeId,
}

impl Request {
    /// Create a new request.
    pub fn new(context: impl Into<String>, filter: Substitution, requester: NodeId) -> Self {
        Self {
            context: context.into(),
            filter,
            requester,
        }
    }
}
