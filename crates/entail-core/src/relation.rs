//! Relation (arc label) types for the semantic network.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A relation label on an arc between two nodes.
///
/// Molecular nodes wire their arguments through named relations; rule nodes
/// reach their antecedents and consequents through the reserved [`Relation::ANT`]
/// and [`Relation::CQ`] labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation(pub String);

impl Relation {
    /// Reserved label: rule node -> antecedent.
    pub const ANT: &'static str = "ant";
    /// Reserved label: rule node -> consequent.
    pub const CQ: &'static str = "cq";

    /// Create a new relation label.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rule-to-antecedent arc label.
    pub fn ant() -> Self {
        Self::new(Self::ANT)
    }

    /// Rule-to-consequent arc label.
    pub fn cq() -> Self {
        Self::new(Self::CQ)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Relation {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Relation {
    fn from(s: String) -> Self {
        Self(s)
    }
}
