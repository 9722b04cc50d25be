//! Antecedent classification, variable-sharing analysis, and the per-kind
//! firing policy.

use crate::{Polarity, Result, RuleUseInfo};
use entail_core::{Network, NodeId, RuleKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The cached classification of a rule node's antecedents.
///
/// Computed once at engine construction; it decides which evidence path -
/// indexed-by-substitution or single aggregated - the rule uses for its
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAnalysis {
    /// Variable-bearing antecedents.
    pub with_vars: BTreeSet<NodeId>,
    /// Constant antecedents.
    pub without_vars: BTreeSet<NodeId>,
    /// True iff every variable-bearing antecedent binds an identical
    /// free-variable set.
    pub share_vars: bool,
    /// Variables occurring in two or more antecedents.
    pub shared_vars: BTreeSet<NodeId>,
    /// Total antecedent count.
    pub antecedent_count: usize,
}

/// Partition an antecedent set into constant and variable-bearing subsets.
///
/// The partition is exact (no overlap, no omission) and idempotent: it
/// depends only on each node's own kind.
pub fn split_antecedents(
    network: &Network,
    antecedents: &[NodeId],
) -> Result<(BTreeSet<NodeId>, BTreeSet<NodeId>)> {
    let mut with_vars = BTreeSet::new();
    let mut without_vars = BTreeSet::new();
    for &ant in antecedents {
        if network.is_constant(ant)? {
            without_vars.insert(ant);
        } else {
            with_vars.insert(ant);
        }
    }
    Ok((with_vars, without_vars))
}

/// True iff every variable-bearing antecedent has an identical free-variable
/// set. An empty set trivially fails.
pub fn all_share_vars(network: &Network, with_vars: &BTreeSet<NodeId>) -> Result<bool> {
    let mut iter = with_vars.iter();
    let Some(&first) = iter.next() else {
        return Ok(false);
    };
    let reference = network.free_vars(first)?;
    for &node in iter {
        if network.free_vars(node)? != reference {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The variables that recur - directly or free inside a composite term -
/// across two or more of the given antecedents.
pub fn shared_var_nodes(
    network: &Network,
    antecedents: &[NodeId],
) -> Result<BTreeSet<NodeId>> {
    let mut seen = BTreeSet::new();
    let mut shared = BTreeSet::new();
    for &ant in antecedents {
        for var in network.free_vars(ant)? {
            if !seen.insert(var) {
                shared.insert(var);
            }
        }
    }
    Ok(shared)
}

/// Classify a rule node's antecedents. Computed once and cached.
pub fn analyze(network: &Network, rule: NodeId) -> Result<RuleAnalysis> {
    let spec = network.rule_spec(rule)?;
    let antecedents = spec.antecedents.clone();
    let (with_vars, without_vars) = split_antecedents(network, &antecedents)?;
    let share_vars = all_share_vars(network, &with_vars)?;
    let with_vars_ordered: Vec<NodeId> = antecedents
        .iter()
        .copied()
        .filter(|a| with_vars.contains(a))
        .collect();
    let shared_vars = shared_var_nodes(network, &with_vars_ordered)?;
    Ok(RuleAnalysis {
        with_vars,
        without_vars,
        share_vars,
        shared_vars,
        antecedent_count: antecedents.len(),
    })
}

/// Decide whether an evidence record satisfies the rule kind's firing
/// policy, and with which polarity.
///
/// The decision is a pure function of the record's counts and the antecedent
/// count, so arrival order cannot change the outcome.
pub fn firing_decision(
    kind: &RuleKind,
    antecedent_count: usize,
    rui: &RuleUseInfo,
) -> Option<Polarity> {
    let n = antecedent_count as u32;
    match *kind {
        RuleKind::AndEntailment => {
            if rui.neg > 0 {
                Some(Polarity::Negative)
            } else if rui.pos == n {
                Some(Polarity::Positive)
            } else {
                None
            }
        }
        RuleKind::OrEntailment => {
            if rui.pos >= 1 {
                Some(Polarity::Positive)
            } else if rui.neg == n {
                Some(Polarity::Negative)
            } else {
                None
            }
        }
        RuleKind::Numerical { min, max } => {
            if rui.pos >= min && rui.pos <= max {
                Some(Polarity::Positive)
            } else if n.saturating_sub(rui.neg) < min {
                Some(Polarity::Negative)
            } else {
                None
            }
        }
        // A threshold rule with min = 1 over all antecedents.
        RuleKind::Implication => {
            if rui.pos >= 1 {
                Some(Polarity::Positive)
            } else if rui.neg == n {
                Some(Polarity::Negative)
            } else {
                None
            }
        }
    }
}
