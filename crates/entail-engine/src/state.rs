//! Per-rule-node evaluation state and the evidence aggregation protocol.

use crate::evidence::{merge_into_slot, MergeOutcome, RuleUseInfo, RuleUseInfoSet};
use crate::rules::{analyze, firing_decision, RuleAnalysis};
use crate::sindex::{SIndex, SIndexMode};
use crate::{Polarity, Report, Result, SupportSet};
use entail_core::{ContextId, Network, NodeId, RuleKind, Substitution};
use std::collections::{HashMap, HashSet};

/// Per-context evidence storage strategy, chosen once from the rule's
/// variable-sharing analysis.
#[derive(Debug)]
pub(crate) enum RuisHandler {
    /// No variable-bearing antecedents: one aggregated record.
    Constant(Option<RuleUseInfo>),
    /// Variable-bearing antecedents without shared variables.
    Linear(RuleUseInfoSet),
    /// Shared variables: substitution-indexed storage.
    Indexed(SIndex),
}

impl RuisHandler {
    fn for_analysis(analysis: &RuleAnalysis) -> Self {
        if analysis.with_vars.is_empty() {
            RuisHandler::Constant(None)
        } else if !analysis.shared_vars.is_empty() {
            let mode = if analysis.share_vars {
                SIndexMode::Singleton
            } else {
                SIndexMode::RuiSet
            };
            RuisHandler::Indexed(SIndex::new(mode, analysis.shared_vars.clone()))
        } else {
            RuisHandler::Linear(RuleUseInfoSet::new())
        }
    }

    fn insert(&mut self, rui: RuleUseInfo) -> Result<Vec<RuleUseInfo>> {
        match self {
            RuisHandler::Constant(slot) => match merge_into_slot(slot, rui)? {
                MergeOutcome::Created(r) | MergeOutcome::Merged(r) => Ok(vec![r]),
                MergeOutcome::Duplicate => Ok(vec![]),
            },
            RuisHandler::Linear(set) => set.insert(rui),
            RuisHandler::Indexed(index) => index.insert(rui),
        }
    }

    fn records(&self) -> Vec<&RuleUseInfo> {
        match self {
            RuisHandler::Constant(slot) => slot.iter().collect(),
            RuisHandler::Linear(set) => set.iter().collect(),
            RuisHandler::Indexed(index) => index.records(),
        }
    }
}

/// A belief the rule decided to emit downstream.
#[derive(Debug, Clone)]
pub(crate) struct Firing {
    pub polarity: Polarity,
    pub substitution: Substitution,
    pub supports: SupportSet,
}

/// The mutable evaluation state of one rule node: the cached antecedent
/// classification, the per-context evidence handlers, the per-context
/// constant-antecedent record for mixed rules, and the emission dedup set.
#[derive(Debug)]
pub(crate) struct RuleState {
    pub kind: RuleKind,
    pub analysis: RuleAnalysis,
    handlers: HashMap<ContextId, RuisHandler>,
    constant_rui: HashMap<ContextId, Option<RuleUseInfo>>,
    fired: HashSet<(ContextId, Substitution, Polarity)>,
}

impl RuleState {
    pub fn new(network: &Network, rule: NodeId) -> Result<Self> {
        let spec = network.rule_spec(rule)?;
        Ok(Self {
            kind: spec.kind.clone(),
            analysis: analyze(network, rule)?,
            handlers: HashMap::new(),
            constant_rui: HashMap::new(),
            fired: HashSet::new(),
        })
    }

    /// The evidence aggregation protocol, invoked once per incoming report
    /// on an antecedent-to-rule channel.
    ///
    /// Builds the unit record for the report, inserts it into the lazily
    /// created per-context handler (constant-antecedent evidence of a mixed
    /// rule aggregates separately and is cross-combined with the variable
    /// side), then runs the firing policy over every candidate the insertion
    /// produced. Each qualifying candidate fires at most once per
    /// (context, substitution, polarity).
    pub fn apply_rule_handler(
        &mut self,
        ctx: ContextId,
        report: &Report,
        signature: NodeId,
    ) -> Result<Vec<Firing>> {
        let rui = RuleUseInfo::from_report(report, signature);
        let mixed_constant = !self.analysis.with_vars.is_empty()
            && self.analysis.without_vars.contains(&signature);

        let mut candidates = Vec::new();
        if mixed_constant {
            let slot = self.constant_rui.entry(ctx).or_default();
            match merge_into_slot(slot, rui)? {
                MergeOutcome::Duplicate => {}
                MergeOutcome::Created(aggregate) | MergeOutcome::Merged(aggregate) => {
                    if let Some(handler) = self.handlers.get(&ctx) {
                        for resident in handler.records() {
                            if resident.disjoint(&aggregate)
                                && resident.substitution.compatible(&aggregate.substitution)
                            {
                                candidates.push(resident.combine(&aggregate)?);
                            }
                        }
                    }
                    candidates.push(aggregate);
                }
            }
        } else {
            let analysis = &self.analysis;
            let handler = self
                .handlers
                .entry(ctx)
                .or_insert_with(|| RuisHandler::for_analysis(analysis));
            let created = handler.insert(rui)?;
            match self.constant_rui.get(&ctx).and_then(Option::as_ref) {
                Some(constant) => {
                    for record in created {
                        candidates.push(record.combine(constant)?);
                        candidates.push(record);
                    }
                }
                None => candidates = created,
            }
        }

        let mut firings = Vec::new();
        for rui in candidates {
            let Some(polarity) = firing_decision(&self.kind, self.analysis.antecedent_count, &rui)
            else {
                continue;
            };
            let key = (ctx, rui.substitution.clone(), polarity);
            if self.fired.insert(key) {
                firings.push(Firing {
                    polarity,
                    substitution: rui.substitution.clone(),
                    supports: rui.supports_union(),
                });
            }
        }
        Ok(firings)
    }

    /// Drop all evidence and emission history. Used by a whole-network reset.
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.constant_rui.clear();
        self.fired.clear();
    }
}
