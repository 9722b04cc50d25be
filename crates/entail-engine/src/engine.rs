//! The inference engine: cooperative scheduling, forward propagation, and
//! backward-chaining queries.

use crate::beliefs::{BeliefRecord, BeliefStore};
use crate::channel::{Channel, ChannelKind, ChannelTable};
use crate::state::{Firing, RuleState};
use crate::{EngineError, Polarity, Report, Request, Result, SupportSet};
use entail_core::{ContextId, ContextStore, Network, NodeId, Substitution};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Configuration for a propagation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on node schedulings per run; exceeding it aborts the run
    /// instead of spinning on a non-quiescing network.
    pub max_rounds: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_rounds: 10_000 }
    }
}

/// What one propagation run did.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PropagationStats {
    /// Node schedulings performed.
    pub rounds: usize,
    /// Reports admitted onto channels.
    pub reports_delivered: usize,
    /// Rule firings emitted.
    pub rules_fired: usize,
}

/// One answer to a query: a binding of the queried node's variables, the
/// justification it rests on, and whether it supports or refutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Bindings for the queried pattern; empty for ground propositions.
    pub substitution: Substitution,
    /// The hypotheses the answer rests on.
    pub supports: SupportSet,
    /// Supports or refutes.
    pub polarity: Polarity,
}

/// The result of a query: every known (substitution, justification) pair,
/// each tagged with its polarity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// The matches found.
    pub matches: Vec<QueryMatch>,
}

impl QueryAnswer {
    /// Whether any match supports the proposition.
    pub fn is_positive(&self) -> bool {
        self.matches
            .iter()
            .any(|m| m.polarity == Polarity::Positive)
    }

    /// Whether nothing is known.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// A context-sensitive forward/backward-chaining inference engine.
///
/// The engine owns the message channels, the per-rule evidence state, and the
/// belief store; it shares the immutable network and the context registry.
/// Scheduling is cooperative and node-at-a-time: each scheduled node drains
/// the full buffer of each of its incoming channels, processes every message,
/// then acknowledges the batch. Evidence mutation for one rule node is
/// serialized behind a per-node lock.
///
/// # Example
///
/// ```rust
/// use entail_core::{ContextStore, Network, RuleKind};
/// use entail_engine::{Engine, Polarity};
/// use std::sync::Arc;
///
/// let mut net = Network::new();
/// let rain = net.add_base("raining").unwrap();
/// let wet = net.add_base("streets-wet").unwrap();
/// let rule = net
///     .add_rule("rain=>wet", RuleKind::Implication, vec![rain], vec![wet])
///     .unwrap();
///
/// let contexts = Arc::new(ContextStore::new());
/// contexts.register("actual");
///
/// let mut engine = Engine::new(Arc::new(net), contexts).unwrap();
/// engine.submit_belief(rule, "actual", Polarity::Positive).unwrap();
/// engine.submit_belief(rain, "actual", Polarity::Positive).unwrap();
///
/// assert!(engine.holds("actual", wet).unwrap());
/// ```
#[derive(Debug)]
pub struct Engine {
    network: Arc<Network>,
    contexts: Arc<ContextStore>,
    config: EngineConfig,
    channels: ChannelTable,
    rules: HashMap<NodeId, Mutex<RuleState>>,
    beliefs: BeliefStore,
    queue: VecDeque<NodeId>,
    queued: HashSet<NodeId>,
    stats: PropagationStats,
}

impl Engine {
    /// Create an engine over a built network with default configuration.
    pub fn new(network: Arc<Network>, contexts: Arc<ContextStore>) -> Result<Self> {
        Self::with_config(network, contexts, EngineConfig::default())
    }

    /// Create an engine with explicit configuration. Classifies every rule
    /// node's antecedents up front.
    pub fn with_config(
        network: Arc<Network>,
        contexts: Arc<ContextStore>,
        config: EngineConfig,
    ) -> Result<Self> {
        let mut rules = HashMap::new();
        for node in network.nodes() {
            if node.is_rule() {
                rules.insert(node.id, Mutex::new(RuleState::new(&network, node.id)?));
            }
        }
        Ok(Self {
            network,
            contexts,
            config,
            channels: ChannelTable::new(),
            rules,
            beliefs: BeliefStore::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            stats: PropagationStats::default(),
        })
    }

    /// The network the engine reasons over.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The context registry.
    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    /// Submit a ground belief, triggering forward propagation until the
    /// derived consequences stabilize.
    pub fn submit_belief(
        &mut self,
        node: NodeId,
        context: &str,
        polarity: Polarity,
    ) -> Result<PropagationStats> {
        let ctx = self.contexts.resolve(context)?;
        if !self.contexts.is_live(ctx) {
            return Err(EngineError::RetiredContext(context.to_string()));
        }
        if !self.network.free_vars(node)?.is_empty() {
            return Err(EngineError::NotGround(node));
        }

        self.contexts.assert_hypothesis(ctx, node)?;
        let supports: SupportSet = [node].into_iter().collect();
        self.beliefs.record(
            ctx,
            node,
            BeliefRecord {
                polarity,
                substitution: Substitution::new(),
                supports: supports.clone(),
            },
        );
        tracing::debug!(node = %node, context, %polarity, "belief submitted");

        self.stats = PropagationStats::default();
        self.emit_reports_from(node, context, polarity, Substitution::new(), supports);
        self.run()
    }

    /// Ask whether, and under what bindings, a proposition holds in a
    /// context. Issues backward-chaining requests to every rule that could
    /// derive the node, runs propagation, then answers from the belief
    /// store.
    pub fn query(&mut self, node: NodeId, context: &str) -> Result<QueryAnswer> {
        let ctx = self.contexts.resolve(context)?;
        if !self.contexts.is_live(ctx) {
            return Err(EngineError::RetiredContext(context.to_string()));
        }

        self.stats = PropagationStats::default();
        for deriver in self.network.rules_deriving(node) {
            let ch = self.channels.ensure(
                ChannelKind::RuleToConsequent,
                deriver,
                node,
                context,
                Substitution::new(),
            );
            if ch.send_request(Request::new(context, Substitution::new(), node)) {
                self.enqueue(deriver);
            }
        }
        self.run()?;
        self.collect_matches(ctx, node)
    }

    /// Whether any positive belief is held for the node in the context.
    pub fn holds(&self, context: &str, node: NodeId) -> Result<bool> {
        let ctx = self.contexts.resolve(context)?;
        Ok(self.beliefs.holds(ctx, node))
    }

    /// The belief records held for the node in the context.
    pub fn beliefs_in(&self, context: &str, node: NodeId) -> Result<Vec<BeliefRecord>> {
        let ctx = self.contexts.resolve(context)?;
        Ok(self.beliefs.records(ctx, node).to_vec())
    }

    /// Drop all evidence, channels, and recorded beliefs. Context identities
    /// and the network survive.
    pub fn reset(&mut self) {
        self.channels.clear();
        self.beliefs.clear();
        self.queue.clear();
        self.queued.clear();
        for state in self.rules.values() {
            state.lock().clear();
        }
        tracing::debug!("engine reset");
    }

    fn enqueue(&mut self, node: NodeId) {
        if self.queued.insert(node) {
            self.queue.push_back(node);
        }
    }

    /// Drive the work queue to quiescence.
    fn run(&mut self) -> Result<PropagationStats> {
        let mut rounds = 0usize;
        while let Some(node) = self.queue.pop_front() {
            self.queued.remove(&node);
            rounds += 1;
            if rounds > self.config.max_rounds {
                return Err(EngineError::PropagationLimit(self.config.max_rounds));
            }
            self.process_requests(node)?;
            self.process_reports(node)?;
        }
        self.stats.rounds = rounds;
        Ok(self.stats)
    }

    /// Send a node's belief onto the antecedent-to-rule channel of every
    /// rule consuming it. A ground belief is additionally routed through
    /// every pattern node it unifies with, carrying the unifying bindings,
    /// so pattern antecedents see instances of themselves.
    fn emit_reports_from(
        &mut self,
        node: NodeId,
        context: &str,
        polarity: Polarity,
        substitution: Substitution,
        supports: SupportSet,
    ) {
        for rule in self.network.rules_consuming(node) {
            let ch = self.channels.ensure(
                ChannelKind::AntecedentToRule,
                node,
                rule,
                context,
                Substitution::new(),
            );
            let report = Report::new(context, polarity, substitution.clone(), supports.clone(), node);
            if ch.send_report(report) {
                self.stats.reports_delivered += 1;
                self.enqueue(rule);
            }
        }

        if substitution.is_empty() {
            for (pattern, bindings) in self.matching_patterns(node) {
                for rule in self.network.rules_consuming(pattern) {
                    let ch = self.channels.ensure(
                        ChannelKind::AntecedentToRule,
                        pattern,
                        rule,
                        context,
                        Substitution::new(),
                    );
                    let report = Report::new(
                        context,
                        polarity,
                        bindings.clone(),
                        supports.clone(),
                        pattern,
                    );
                    if ch.send_report(report) {
                        self.stats.reports_delivered += 1;
                        self.enqueue(rule);
                    }
                }
            }
        }
    }

    /// The pattern nodes a ground node is an instance of, with the unifying
    /// bindings.
    fn matching_patterns(&self, node: NodeId) -> Vec<(NodeId, Substitution)> {
        let mut hits = Vec::new();
        for pattern in self.network.nodes() {
            if pattern.id == node || pattern.is_rule() {
                continue;
            }
            let has_vars = self
                .network
                .free_vars(pattern.id)
                .map_or(false, |vars| !vars.is_empty());
            if !has_vars {
                continue;
            }
            if let Ok(Some(bindings)) = self.network.unify(pattern.id, node) {
                hits.push((pattern.id, bindings));
            }
        }
        hits
    }

    /// Believed ground nodes in the context that are instances of a pattern
    /// node, with the unifying bindings. Empty for ground nodes.
    fn believed_instances(&self, ctx: ContextId, node: NodeId) -> Vec<(NodeId, Substitution)> {
        let has_vars = self
            .network
            .free_vars(node)
            .map_or(false, |vars| !vars.is_empty());
        if !has_vars {
            return vec![];
        }
        let mut hits = Vec::new();
        for (other, _) in self.beliefs.iter_context(ctx) {
            if other == node {
                continue;
            }
            if let Ok(Some(bindings)) = self.network.unify(node, other) {
                hits.push((other, bindings));
            }
        }
        hits
    }

    /// Drain and process every report buffer the node listens on.
    fn process_reports(&mut self, node: NodeId) -> Result<()> {
        let is_rule = self.network.node(node)?.is_rule();
        for ch in self.channels.incoming(node) {
            let batch = ch.peek_reports();
            if batch.is_empty() {
                continue;
            }
            for report in &batch {
                let ctx = self.contexts.resolve(&report.context)?;
                if !self.contexts.is_live(ctx) {
                    tracing::debug!(context = %report.context, "dropping report for retired context");
                    continue;
                }
                if is_rule && ch.kind == ChannelKind::AntecedentToRule {
                    self.apply_to_rule(node, ctx, report, ch.reporter)?;
                } else {
                    let record = BeliefRecord {
                        polarity: report.polarity,
                        substitution: report.substitution.clone(),
                        supports: report.supports.clone(),
                    };
                    if self.beliefs.record(ctx, node, record) {
                        tracing::debug!(node = %node, context = %report.context, "belief derived");
                        self.emit_reports_from(
                            node,
                            &report.context,
                            report.polarity,
                            report.substitution.clone(),
                            report.supports.clone(),
                        );
                    }
                }
            }
            ch.ack_reports(batch.len());
        }
        Ok(())
    }

    fn apply_to_rule(
        &mut self,
        rule: NodeId,
        ctx: ContextId,
        report: &Report,
        signature: NodeId,
    ) -> Result<()> {
        let firings = {
            let state = self
                .rules
                .get(&rule)
                .ok_or_else(|| EngineError::Unsupported(format!("no rule state for {rule}")))?;
            state.lock().apply_rule_handler(ctx, report, signature)?
        };
        for firing in firings {
            self.stats.rules_fired += 1;
            self.deliver_firing(rule, &report.context, &firing)?;
        }
        Ok(())
    }

    /// Put a firing's report on every rule-to-consequent channel scoped to
    /// the triggering context.
    fn deliver_firing(&mut self, rule: NodeId, context: &str, firing: &Firing) -> Result<()> {
        tracing::debug!(rule = %rule, polarity = %firing.polarity, "rule fired");
        let consequents = self.network.rule_spec(rule)?.consequents.clone();
        for cq in consequents {
            let ch = self.channels.ensure(
                ChannelKind::RuleToConsequent,
                rule,
                cq,
                context,
                Substitution::new(),
            );
            let report = Report::new(
                context,
                firing.polarity,
                firing.substitution.clone(),
                firing.supports.clone(),
                rule,
            );
            if ch.send_report(report) {
                self.stats.reports_delivered += 1;
                self.enqueue(cq);
            }
        }
        Ok(())
    }

    /// Drain and process every request buffer addressed to the node.
    fn process_requests(&mut self, node: NodeId) -> Result<()> {
        let is_rule = self.network.node(node)?.is_rule();
        for ch in self.channels.outgoing(node) {
            let batch = ch.peek_requests();
            if batch.is_empty() {
                continue;
            }
            for request in &batch {
                let ctx = self.contexts.resolve(&request.context)?;
                if !self.contexts.is_live(ctx) {
                    tracing::debug!(context = %request.context, "dropping request for retired context");
                    continue;
                }
                if is_rule && ch.kind == ChannelKind::RuleToConsequent {
                    self.forward_rule_request(node, ctx, request)?;
                } else {
                    self.answer_node_request(node, ctx, &ch, request);
                }
            }
            ch.ack_requests(batch.len());
        }
        Ok(())
    }

    /// Backward chaining at a rule node: forward the request to every
    /// antecedent that did not originate it, with the same filter and
    /// context. A rule only derives in contexts where it is itself believed.
    ///
    /// Variables the filter leaves unbound are wildcards: antecedents report
    /// every matching instance and the evidence index reconciles the
    /// bindings.
    fn forward_rule_request(
        &mut self,
        rule: NodeId,
        ctx: ContextId,
        request: &Request,
    ) -> Result<()> {
        if !self.contexts.is_asserted(ctx, rule) && !self.beliefs.holds(ctx, rule) {
            tracing::trace!(rule = %rule, context = %request.context, "rule not believed; request not forwarded");
            return Ok(());
        }
        let antecedents = self.network.rule_spec(rule)?.antecedents.clone();
        for ant in antecedents {
            if ant == request.requester {
                continue;
            }
            let ch = self.channels.ensure(
                ChannelKind::AntecedentToRule,
                ant,
                rule,
                &request.context,
                request.filter.clone(),
            );
            if ch.send_request(Request::new(
                request.context.clone(),
                request.filter.clone(),
                rule,
            )) {
                self.enqueue(ant);
            }
        }
        Ok(())
    }

    /// Backward chaining at a proposition node: report whatever is already
    /// believed - hypothesis assertions, derived records, and for patterns
    /// any believed ground instance - that matches the filter, then recurse
    /// to the rules that could derive the node.
    fn answer_node_request(
        &mut self,
        node: NodeId,
        ctx: ContextId,
        ch: &Arc<Channel>,
        request: &Request,
    ) {
        let mut replies: Vec<Report> = Vec::new();
        if self.contexts.is_asserted(ctx, node) {
            replies.push(Report::new(
                request.context.clone(),
                Polarity::Positive,
                Substitution::new(),
                [node].into_iter().collect(),
                node,
            ));
        }
        for rec in self.beliefs.records(ctx, node) {
            if !rec.substitution.compatible(&request.filter) {
                continue;
            }
            let report = Report::new(
                request.context.clone(),
                rec.polarity,
                rec.substitution.clone(),
                rec.supports.clone(),
                node,
            );
            if !replies.contains(&report) {
                replies.push(report);
            }
        }
        for (instance, bindings) in self.believed_instances(ctx, node) {
            if !bindings.compatible(&request.filter) {
                continue;
            }
            for rec in self.beliefs.records(ctx, instance) {
                if !rec.substitution.is_empty() {
                    continue;
                }
                let report = Report::new(
                    request.context.clone(),
                    rec.polarity,
                    bindings.clone(),
                    rec.supports.clone(),
                    node,
                );
                if !replies.contains(&report) {
                    replies.push(report);
                }
            }
        }
        let mut answered = false;
        for report in replies {
            if ch.send_report(report) {
                self.stats.reports_delivered += 1;
                answered = true;
            }
        }
        if answered {
            self.enqueue(ch.listener);
        }

        for deriver in self.network.rules_deriving(node) {
            let rch = self.channels.ensure(
                ChannelKind::RuleToConsequent,
                deriver,
                node,
                &request.context,
                request.filter.clone(),
            );
            if rch.send_request(Request::new(
                request.context.clone(),
                request.filter.clone(),
                node,
            )) {
                self.enqueue(deriver);
            }
        }
    }

    /// Gather everything believed about the node (and, for patterns, every
    /// ground instance unifying with it) in the context.
    fn collect_matches(&self, ctx: ContextId, node: NodeId) -> Result<QueryAnswer> {
        let mut matches: Vec<QueryMatch> = self
            .beliefs
            .records(ctx, node)
            .iter()
            .map(|rec| QueryMatch {
                substitution: rec.substitution.clone(),
                supports: rec.supports.clone(),
                polarity: rec.polarity,
            })
            .collect();

        if !self.network.free_vars(node)?.is_empty() {
            for (other, records) in self.beliefs.iter_context(ctx) {
                if other == node {
                    continue;
                }
                let Some(subst) = self.network.unify(node, other)? else {
                    continue;
                };
                for rec in records {
                    if !rec.substitution.is_empty() {
                        continue;
                    }
                    let m = QueryMatch {
                        substitution: subst.clone(),
                        supports: rec.supports.clone(),
                        polarity: rec.polarity,
                    };
                    if !matches.contains(&m) {
                        matches.push(m);
                    }
                }
            }
        }
        Ok(QueryAnswer { matches })
    }
}
