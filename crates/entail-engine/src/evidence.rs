//! Evidence records: flag nodes and rule-use information.

use crate::{EngineError, Polarity, Report, Result, SupportSet};
use entail_core::{NodeId, Substitution};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// A single polarity-tagged contribution to a rule-use record: the
/// contributing antecedent node and the justification it arrived with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagNode {
    /// The contributing antecedent node.
    pub node: NodeId,
    /// The justification set the contribution carried.
    pub supports: SupportSet,
    /// Supporting or refuting.
    pub polarity: Polarity,
}

impl FlagNode {
    /// Create a new flag node.
    pub fn new(node: NodeId, supports: SupportSet, polarity: Polarity) -> Self {
        Self {
            node,
            supports,
            polarity,
        }
    }
}

/// The flag nodes of one rule-use record, keyed by contributing node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagNodeSet(BTreeMap<NodeId, FlagNode>);

impl FlagNodeSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding one flag node.
    pub fn singleton(flag: FlagNode) -> Self {
        let mut set = Self::new();
        set.0.insert(flag.node, flag);
        set
    }

    /// Number of contributions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The contribution from `node`, if any.
    pub fn get(&self, node: NodeId) -> Option<&FlagNode> {
        self.0.get(&node)
    }

    /// Iterate over contributions in node order.
    pub fn iter(&self) -> impl Iterator<Item = &FlagNode> {
        self.0.values()
    }

    /// Whether no node contributed to both sets.
    pub fn disjoint(&self, other: &Self) -> bool {
        self.0.keys().all(|n| !other.0.contains_key(n))
    }

    /// Union of two disjoint sets; contributions from the same node in both
    /// sides are an evidence-corruption error.
    pub fn union(&self, other: &Self) -> Result<Self> {
        let mut merged = self.0.clone();
        for (node, flag) in &other.0 {
            match merged.entry(*node) {
                Entry::Vacant(slot) => {
                    slot.insert(flag.clone());
                }
                Entry::Occupied(_) => {
                    return Err(EngineError::EvidenceCorruption(format!(
                        "node {node} contributed to both records being combined"
                    )));
                }
            }
        }
        Ok(Self(merged))
    }

    /// Union of every contribution's justification set.
    pub fn supports_union(&self) -> SupportSet {
        let mut union = SupportSet::new();
        for flag in self.0.values() {
            union.extend(flag.supports.iter().copied());
        }
        union
    }
}

/// The evidence record for one rule node, one context, and one substitution:
/// counts of supporting and refuting contributions plus the flag nodes that
/// produced them.
///
/// Invariant: `flags.len() == pos + neg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleUseInfo {
    /// The bindings this evidence is about.
    pub substitution: Substitution,
    /// Count of supporting contributions.
    pub pos: u32,
    /// Count of refuting contributions.
    pub neg: u32,
    /// The contributions merged in.
    pub flags: FlagNodeSet,
}

impl RuleUseInfo {
    /// Build the unit record for one incoming report: one flag node, one
    /// count on the side of the report's polarity.
    pub fn from_report(report: &Report, signature: NodeId) -> Self {
        let flag = FlagNode::new(signature, report.supports.clone(), report.polarity);
        let (pos, neg) = match report.polarity {
            Polarity::Positive => (1, 0),
            Polarity::Negative => (0, 1),
        };
        Self {
            substitution: report.substitution.clone(),
            pos,
            neg,
            flags: FlagNodeSet::singleton(flag),
        }
    }

    /// Combine two records for compatible substitutions into one: counts
    /// sum, flag sets union, substitutions merge. Commutative and
    /// associative. Incompatible substitutions or overlapping flag sets are
    /// evidence corruption, not a recoverable condition.
    pub fn combine(&self, other: &Self) -> Result<Self> {
        let substitution = self.substitution.merge(&other.substitution).ok_or_else(|| {
            EngineError::EvidenceCorruption(format!(
                "incompatible substitutions {} and {}",
                self.substitution, other.substitution
            ))
        })?;
        let flags = self.flags.union(&other.flags)?;
        Ok(Self {
            substitution,
            pos: self.pos + other.pos,
            neg: self.neg + other.neg,
            flags,
        })
    }

    /// Whether the two records draw on disjoint contributions.
    pub fn disjoint(&self, other: &Self) -> bool {
        self.flags.disjoint(&other.flags)
    }

    /// The union of the justification sets merged into this record.
    pub fn supports_union(&self) -> SupportSet {
        self.flags.supports_union()
    }
}

/// Outcome of merging an incoming record into an aggregated slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No record existed; the incoming record became the slot.
    Created(RuleUseInfo),
    /// The records merged successfully.
    Merged(RuleUseInfo),
    /// The incoming contribution was already recorded; nothing changed.
    Duplicate,
}

/// Merge `rui` into a single-record slot.
///
/// The same antecedent re-contributing with the same polarity is idempotent;
/// contributing the opposite polarity into an aggregated record, or arriving
/// with an incompatible substitution, is evidence corruption.
pub fn merge_into_slot(slot: &mut Option<RuleUseInfo>, rui: RuleUseInfo) -> Result<MergeOutcome> {
    let Some(existing) = slot.as_ref() else {
        *slot = Some(rui.clone());
        return Ok(MergeOutcome::Created(rui));
    };

    for flag in rui.flags.iter() {
        if let Some(prior) = existing.flags.get(flag.node) {
            if prior.polarity == flag.polarity {
                return Ok(MergeOutcome::Duplicate);
            }
            return Err(EngineError::EvidenceCorruption(format!(
                "node {} contributed both polarities to one record",
                flag.node
            )));
        }
    }

    let merged = existing.combine(&rui)?;
    *slot = Some(merged.clone());
    Ok(MergeOutcome::Merged(merged))
}

/// A linear store of rule-use records, used when the rule's variable-bearing
/// antecedents share no variables.
///
/// Insertion pairwise-combines the incoming unit record with every resident
/// it is compatible with and disjoint from, keeps the combinations as
/// residents, and returns the newly created records - the candidates a rule
/// kind decides over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleUseInfoSet(Vec<RuleUseInfo>);

impl RuleUseInfoSet {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident records.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over resident records.
    pub fn iter(&self) -> impl Iterator<Item = &RuleUseInfo> {
        self.0.iter()
    }

    /// Insert a record, returning every record this insertion newly created.
    /// Re-inserting an already-known record is idempotent and creates
    /// nothing.
    pub fn insert(&mut self, rui: RuleUseInfo) -> Result<Vec<RuleUseInfo>> {
        if self.0.contains(&rui) {
            return Ok(vec![]);
        }
        let mut created = vec![rui.clone()];
        for existing in &self.0 {
            if existing.disjoint(&rui) && existing.substitution.compatible(&rui.substitution) {
                created.push(existing.combine(&rui)?);
            }
        }
        self.0.extend(created.iter().cloned());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: u32) -> NodeId {
        NodeId(i)
    }

    fn supports(ids: &[u32]) -> SupportSet {
        ids.iter().map(|&i| n(i)).collect()
    }

    fn unit(node: u32, polarity: Polarity, sup: &[u32]) -> RuleUseInfo {
        RuleUseInfo {
            substitution: Substitution::new(),
            pos: u32::from(polarity == Polarity::Positive),
            neg: u32::from(polarity == Polarity::Negative),
            flags: FlagNodeSet::singleton(FlagNode::new(n(node), supports(sup), polarity)),
        }
    }

    #[test]
    fn test_combine_sums_counts_and_unions_flags() {
        let a = unit(1, Polarity::Positive, &[10]);
        let b = unit(2, Polarity::Negative, &[20]);

        let ab = a.combine(&b).unwrap();
        assert_eq!(ab.pos, 1);
        assert_eq!(ab.neg, 1);
        assert_eq!(ab.flags.len(), 2);
        assert_eq!(ab.flags.len() as u32, ab.pos + ab.neg);
        assert_eq!(ab.supports_union(), supports(&[10, 20]));
    }

    #[test]
    fn test_combine_is_commutative() {
        let a = unit(1, Polarity::Positive, &[10]);
        let b = unit(2, Polarity::Positive, &[20]);
        assert_eq!(a.combine(&b).unwrap(), b.combine(&a).unwrap());
    }

    #[test]
    fn test_combine_rejects_overlapping_flags() {
        let a = unit(1, Polarity::Positive, &[10]);
        let b = unit(1, Polarity::Positive, &[20]);
        assert!(matches!(
            a.combine(&b),
            Err(EngineError::EvidenceCorruption(_))
        ));
    }

    #[test]
    fn test_combine_rejects_incompatible_substitutions() {
        let mut a = unit(1, Polarity::Positive, &[10]);
        a.substitution = Substitution::new().bind(n(5), n(6));
        let mut b = unit(2, Polarity::Positive, &[20]);
        b.substitution = Substitution::new().bind(n(5), n(7));
        assert!(matches!(
            a.combine(&b),
            Err(EngineError::EvidenceCorruption(_))
        ));
    }

    #[test]
    fn test_merge_into_slot_outcomes() {
        let mut slot = None;
        let a = unit(1, Polarity::Positive, &[10]);
        assert!(matches!(
            merge_into_slot(&mut slot, a.clone()).unwrap(),
            MergeOutcome::Created(_)
        ));

        // Same contribution again: idempotent.
        assert_eq!(
            merge_into_slot(&mut slot, a.clone()).unwrap(),
            MergeOutcome::Duplicate
        );

        // A second antecedent merges.
        let b = unit(2, Polarity::Positive, &[20]);
        let MergeOutcome::Merged(merged) = merge_into_slot(&mut slot, b).unwrap() else {
            panic!("expected merge");
        };
        assert_eq!(merged.pos, 2);

        // Opposite polarity from a recorded contributor is corruption.
        let contradictory = unit(1, Polarity::Negative, &[10]);
        assert!(matches!(
            merge_into_slot(&mut slot, contradictory),
            Err(EngineError::EvidenceCorruption(_))
        ));
    }

    #[test]
    fn test_linear_insert_combines_disjoint_residents() {
        let mut set = RuleUseInfoSet::new();
        let a = unit(1, Polarity::Positive, &[10]);
        let b = unit(2, Polarity::Positive, &[20]);

        let first = set.insert(a.clone()).unwrap();
        assert_eq!(first.len(), 1);

        let second = set.insert(b).unwrap();
        // The unit record plus its combination with the first resident.
        assert_eq!(second.len(), 2);
        assert!(second.iter().any(|r| r.pos == 2));

        // Idempotent re-insertion.
        assert!(set.insert(a).unwrap().is_empty());
    }
}
