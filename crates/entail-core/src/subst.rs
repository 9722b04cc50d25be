//! Variable substitutions.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A binding of pattern variables to concrete terms.
///
/// Stored as an ordered map so substitutions have a stable `Ord`/`Hash` and
/// can key evidence indexes directly.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Substitution(BTreeMap<NodeId, NodeId>);

impl Substitution {
    /// The empty substitution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `var` to `term`, returning self for chaining.
    pub fn bind(mut self, var: NodeId, term: NodeId) -> Self {
        self.0.insert(var, term);
        self
    }

    /// Insert a binding in place.
    pub fn insert(&mut self, var: NodeId, term: NodeId) {
        self.0.insert(var, term);
    }

    /// The term bound to `var`, if any.
    pub fn get(&self, var: NodeId) -> Option<NodeId> {
        self.0.get(&var).copied()
    }

    /// Whether `var` is bound.
    pub fn binds(&self, var: NodeId) -> bool {
        self.0.contains_key(&var)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (variable, term) pairs in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.0.iter().map(|(&v, &t)| (v, t))
    }

    /// Two substitutions are compatible iff they agree on every variable
    /// bound by both.
    pub fn compatible(&self, other: &Self) -> bool {
        self.0
            .iter()
            .all(|(v, t)| other.0.get(v).map_or(true, |u| u == t))
    }

    /// Merge two compatible substitutions into their union; `None` if any
    /// shared variable disagrees.
    pub fn merge(&self, other: &Self) -> Option<Self> {
        if !self.compatible(other) {
            return None;
        }
        let mut merged = self.0.clone();
        for (&v, &t) in &other.0 {
            merged.insert(v, t);
        }
        Some(Self(merged))
    }

    /// Restrict to the bindings of the given variables.
    pub fn project(&self, vars: &BTreeSet<NodeId>) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(v, _)| vars.contains(v))
                .map(|(&v, &t)| (v, t))
                .collect(),
        )
    }

    /// Whether every variable in `vars` is bound.
    pub fn is_ground_for(&self, vars: &BTreeSet<NodeId>) -> bool {
        vars.iter().all(|v| self.0.contains_key(v))
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (v, t)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}->{t}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(NodeId, NodeId)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (NodeId, NodeId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
