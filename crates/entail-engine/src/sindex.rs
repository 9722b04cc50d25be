//! Substitution-keyed evidence indexing.

use crate::evidence::{merge_into_slot, MergeOutcome, RuleUseInfo, RuleUseInfoSet};
use crate::Result;
use entail_core::{NodeId, Substitution};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How an [`SIndex`] stores the evidence behind each key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SIndexMode {
    /// Every variable-bearing antecedent binds the identical variable set, so
    /// one aggregated record per key suffices.
    Singleton,
    /// Variables are shared non-uniformly; each key holds a set of records
    /// that combine pairwise as bindings allow.
    RuiSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Slot {
    Single(Option<RuleUseInfo>),
    Set(RuleUseInfoSet),
}

/// Evidence storage keyed by the bindings of a rule's shared variables.
///
/// The key of an incoming record is its substitution projected onto the
/// shared-variable set, so evidence for `{?x->a}` and `{?x->b}` lands in
/// distinct slots and is never merged across bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SIndex {
    mode: SIndexMode,
    shared: BTreeSet<NodeId>,
    slots: BTreeMap<Substitution, Slot>,
}

impl SIndex {
    /// Create an empty index over the given shared variables.
    pub fn new(mode: SIndexMode, shared: BTreeSet<NodeId>) -> Self {
        Self {
            mode,
            shared,
            slots: BTreeMap::new(),
        }
    }

    /// The storage mode.
    pub fn mode(&self) -> SIndexMode {
        self.mode
    }

    /// Insert a record under its projected key, returning the records this
    /// insertion newly created or extended.
    pub fn insert(&mut self, rui: RuleUseInfo) -> Result<Vec<RuleUseInfo>> {
        let key = rui.substitution.project(&self.shared);
        let slot = self.slots.entry(key).or_insert_with(|| match self.mode {
            SIndexMode::Singleton => Slot::Single(None),
            SIndexMode::RuiSet => Slot::Set(RuleUseInfoSet::new()),
        });
        match slot {
            Slot::Single(record) => match merge_into_slot(record, rui)? {
                MergeOutcome::Created(r) | MergeOutcome::Merged(r) => Ok(vec![r]),
                MergeOutcome::Duplicate => Ok(vec![]),
            },
            Slot::Set(set) => set.insert(rui),
        }
    }

    /// Number of distinct keys with evidence.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the index holds no evidence.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over every stored record across all keys.
    pub fn records(&self) -> Vec<&RuleUseInfo> {
        let mut out = Vec::new();
        for slot in self.slots.values() {
            match slot {
                Slot::Single(Some(r)) => out.push(r),
                Slot::Single(None) => {}
                Slot::Set(set) => out.extend(set.iter()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{FlagNode, FlagNodeSet};
    use crate::Polarity;
    use crate::SupportSet;

    fn n(i: u32) -> NodeId {
        NodeId(i)
    }

    fn rui_with(node: u32, subst: Substitution) -> RuleUseInfo {
        RuleUseInfo {
            substitution: subst,
            pos: 1,
            neg: 0,
            flags: FlagNodeSet::singleton(FlagNode::new(
                n(node),
                SupportSet::new(),
                Polarity::Positive,
            )),
        }
    }

    #[test]
    fn test_distinct_bindings_stay_separate() {
        let x = n(100);
        let shared: BTreeSet<_> = [x].into_iter().collect();
        let mut index = SIndex::new(SIndexMode::Singleton, shared);

        let at_a = index
            .insert(rui_with(1, Substitution::new().bind(x, n(1_000))))
            .unwrap();
        let at_b = index
            .insert(rui_with(2, Substitution::new().bind(x, n(2_000))))
            .unwrap();

        assert_eq!(at_a.len(), 1);
        assert_eq!(at_b.len(), 1);
        assert_eq!(index.len(), 2);
        assert!(index.records().iter().all(|r| r.pos == 1));
    }

    #[test]
    fn test_same_binding_aggregates() {
        let x = n(100);
        let shared: BTreeSet<_> = [x].into_iter().collect();
        let mut index = SIndex::new(SIndexMode::Singleton, shared);
        let bind = Substitution::new().bind(x, n(1_000));

        index.insert(rui_with(1, bind.clone())).unwrap();
        let merged = index.insert(rui_with(2, bind)).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pos, 2);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_ruiset_mode_keys_on_shared_subset() {
        let x = n(100);
        let y = n(101);
        let shared: BTreeSet<_> = [x].into_iter().collect();
        let mut index = SIndex::new(SIndexMode::RuiSet, shared);

        // Same shared binding, different non-shared bindings: both live under
        // one key and combine.
        let first = Substitution::new().bind(x, n(1_000)).bind(y, n(5));
        let second = Substitution::new().bind(x, n(1_000)).bind(y, n(6));
        index.insert(rui_with(1, first)).unwrap();
        let created = index.insert(rui_with(2, second)).unwrap();

        assert_eq!(index.len(), 1);
        // The unit record; the combination is refused by binding conflict on y.
        assert_eq!(created.len(), 1);

        // Compatible non-shared bindings do combine.
        let third = Substitution::new().bind(x, n(1_000));
        let created = index.insert(rui_with(3, third)).unwrap();
        assert!(created.iter().any(|r| r.pos == 2));
    }
}
