//! Per-context record of submitted and derived beliefs.

use crate::{Polarity, SupportSet};
use entail_core::{ContextId, NodeId, Substitution};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One belief instance held for a node in a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeliefRecord {
    /// Supports or refutes the node.
    pub polarity: Polarity,
    /// Bindings of the node's variables for this instance; empty for ground
    /// beliefs.
    pub substitution: Substitution,
    /// The hypotheses this belief rests on.
    pub supports: SupportSet,
}

/// Everything believed per context, keyed by context identity so isolation
/// between contexts is structural.
#[derive(Debug, Default)]
pub struct BeliefStore {
    map: HashMap<ContextId, HashMap<NodeId, Vec<BeliefRecord>>>,
}

impl BeliefStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a belief. Returns false if an identical record is already
    /// held.
    pub fn record(&mut self, ctx: ContextId, node: NodeId, record: BeliefRecord) -> bool {
        let records = self.map.entry(ctx).or_default().entry(node).or_default();
        if records.contains(&record) {
            return false;
        }
        records.push(record);
        true
    }

    /// The records held for a node in a context.
    pub fn records(&self, ctx: ContextId, node: NodeId) -> &[BeliefRecord] {
        self.map
            .get(&ctx)
            .and_then(|nodes| nodes.get(&node))
            .map_or(&[], Vec::as_slice)
    }

    /// Whether any positive record is held for the node in the context.
    pub fn holds(&self, ctx: ContextId, node: NodeId) -> bool {
        self.records(ctx, node)
            .iter()
            .any(|r| r.polarity == Polarity::Positive)
    }

    /// Iterate over every (node, records) pair of a context.
    pub fn iter_context(
        &self,
        ctx: ContextId,
    ) -> impl Iterator<Item = (NodeId, &[BeliefRecord])> {
        self.map
            .get(&ctx)
            .into_iter()
            .flat_map(|nodes| nodes.iter().map(|(&n, v)| (n, v.as_slice())))
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dedups_and_isolates_contexts() {
        let mut store = BeliefStore::new();
        let rec = BeliefRecord {
            polarity: Polarity::Positive,
            substitution: Substitution::new(),
            supports: SupportSet::new(),
        };

        assert!(store.record(ContextId(0), NodeId(1), rec.clone()));
        assert!(!store.record(ContextId(0), NodeId(1), rec.clone()));
        assert!(store.record(ContextId(1), NodeId(1), rec));

        assert!(store.holds(ContextId(0), NodeId(1)));
        assert!(store.holds(ContextId(1), NodeId(1)));
        assert_eq!(store.records(ContextId(0), NodeId(1)).len(), 1);
        assert!(store.records(ContextId(2), NodeId(1)).is_empty());
    }
}
