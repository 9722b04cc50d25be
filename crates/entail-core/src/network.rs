//! The semantic network: an append-only graph of typed nodes.

use crate::{Error, Node, NodeId, NodeKind, Relation, Result, RuleKind, RuleSpec, Substitution, Wire};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A semantic network: typed nodes connected by labeled relations.
///
/// Uses petgraph's directed graph internally; arcs run from a composite node
/// to its arguments (down-cables), so the rules consuming or deriving a node
/// are found by walking incoming `ant`/`cq` arcs.
///
/// The network is append-only. The inference engine reads topology but never
/// mutates it after construction.
///
/// # Example
///
/// ```rust
/// use entail_core::{Network, RuleKind};
///
/// let mut net = Network::new();
/// let p = net.add_base("p").unwrap();
/// let q = net.add_base("q").unwrap();
/// let rule = net
///     .add_rule("p=>q", RuleKind::Implication, vec![p], vec![q])
///     .unwrap();
///
/// assert_eq!(net.rules_consuming(p), vec![rule]);
/// assert_eq!(net.rules_deriving(q), vec![rule]);
/// ```
#[derive(Debug, Default)]
pub struct Network {
    /// The underlying directed graph.
    graph: DiGraph<Node, Relation>,
    /// Map from node name to id.
    by_name: HashMap<String, NodeId>,
    /// Map from node id to graph index.
    index: Vec<NodeIndex>,
    /// Cached free-variable sets, one per node.
    free_vars: Vec<BTreeSet<NodeId>>,
}

impl Network {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: String, kind: NodeKind, free: BTreeSet<NodeId>) -> Result<NodeId> {
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateNode(name));
        }
        let id = NodeId(self.index.len() as u32);
        let idx = self.graph.add_node(Node {
            id,
            name: name.clone(),
            kind,
        });
        self.by_name.insert(name, id);
        self.index.push(idx);
        self.free_vars.push(free);
        Ok(id)
    }

    fn free_vars_of(&self, id: NodeId) -> Result<BTreeSet<NodeId>> {
        let node = self.node(id)?;
        if node.is_variable() {
            return Ok([id].into_iter().collect());
        }
        Ok(self.free_vars[id.index()].clone())
    }

    /// Add an individual constant or atomic proposition.
    pub fn add_base(&mut self, name: impl Into<String>) -> Result<NodeId> {
        self.insert(name.into(), NodeKind::Base, BTreeSet::new())
    }

    /// Add a pattern variable.
    pub fn add_variable(&mut self, name: impl Into<String>) -> Result<NodeId> {
        self.insert(name.into(), NodeKind::Variable, BTreeSet::new())
    }

    /// Add a composite proposition or pattern built from labeled wires.
    ///
    /// All wire targets must already exist; free variables are derived from
    /// the targets and cached.
    pub fn add_molecular(
        &mut self,
        name: impl Into<String>,
        wires: Vec<Wire>,
    ) -> Result<NodeId> {
        let mut free = BTreeSet::new();
        for wire in &wires {
            free.extend(self.free_vars_of(wire.target)?);
        }
        let id = self.insert(name.into(), NodeKind::Molecular { wires: wires.clone() }, free)?;
        for wire in wires {
            self.graph.add_edge(
                self.index[id.index()],
                self.index[wire.target.index()],
                wire.relation,
            );
        }
        Ok(id)
    }

    /// Add a rule node.
    ///
    /// Malformed definitions (no antecedents, no consequents, numerical
    /// bounds that cannot be met) are checked construction errors.
    pub fn add_rule(
        &mut self,
        name: impl Into<String>,
        kind: RuleKind,
        antecedents: Vec<NodeId>,
        consequents: Vec<NodeId>,
    ) -> Result<NodeId> {
        if antecedents.is_empty() {
            return Err(Error::InvalidRule("rule has no antecedents".into()));
        }
        if consequents.is_empty() {
            return Err(Error::InvalidRule("rule has no consequents".into()));
        }
        if let RuleKind::Numerical { min, max } = kind {
            let n = antecedents.len() as u32;
            if min > max || max > n {
                return Err(Error::InvalidRule(format!(
                    "numerical bounds ({min}, {max}) invalid over {n} antecedents"
                )));
            }
        }

        let mut free = BTreeSet::new();
        for &node in antecedents.iter().chain(consequents.iter()) {
            free.extend(self.free_vars_of(node)?);
        }

        let spec = RuleSpec {
            kind,
            antecedents: antecedents.clone(),
            consequents: consequents.clone(),
        };
        let id = self.insert(name.into(), NodeKind::Rule(spec), free)?;
        for ant in antecedents {
            self.graph
                .add_edge(self.index[id.index()], self.index[ant.index()], Relation::ant());
        }
        for cq in consequents {
            self.graph
                .add_edge(self.index[id.index()], self.index[cq.index()], Relation::cq());
        }
        Ok(id)
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.index
            .get(id.index())
            .map(|&idx| &self.graph[idx])
            .ok_or(Error::UnknownNode(id))
    }

    /// Get a node by name.
    pub fn node_by_name(&self, name: &str) -> Result<&Node> {
        let id = self
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownNodeName(name.to_string()))?;
        self.node(id)
    }

    /// The free variables of a node. A variable node is free in itself.
    pub fn free_vars(&self, id: NodeId) -> Result<BTreeSet<NodeId>> {
        self.free_vars_of(id)
    }

    /// Whether the node is constant for antecedent classification.
    pub fn is_constant(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.is_constant())
    }

    /// The rule spec of a rule node.
    pub fn rule_spec(&self, id: NodeId) -> Result<&RuleSpec> {
        self.node(id)?.rule_spec().ok_or(Error::NotARule(id))
    }

    fn incoming_by(&self, id: NodeId, label: &str) -> Vec<NodeId> {
        let Some(&idx) = self.index.get(id.index()) else {
            return vec![];
        };
        let mut out: Vec<NodeId> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.weight().as_str() == label)
            .map(|e| self.graph[e.source()].id)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// The rule nodes that have `id` among their antecedents.
    pub fn rules_consuming(&self, id: NodeId) -> Vec<NodeId> {
        self.incoming_by(id, Relation::ANT)
    }

    /// The rule nodes that have `id` among their consequents.
    pub fn rules_deriving(&self, id: NodeId) -> Vec<NodeId> {
        self.incoming_by(id, Relation::CQ)
    }

    /// Unify a pattern node against a ground node, producing the binding of
    /// the pattern's variables, or `None` if the two cannot match.
    pub fn unify(&self, pattern: NodeId, ground: NodeId) -> Result<Option<Substitution>> {
        let mut subst = Substitution::new();
        if self.unify_into(pattern, ground, &mut subst)? {
            Ok(Some(subst))
        } else {
            Ok(None)
        }
    }

    fn unify_into(
        &self,
        pattern: NodeId,
        ground: NodeId,
        subst: &mut Substitution,
    ) -> Result<bool> {
        if pattern == ground {
            return Ok(true);
        }
        let p = self.node(pattern)?;
        match &p.kind {
            NodeKind::Variable => match subst.get(pattern) {
                Some(bound) => Ok(bound == ground),
                None => {
                    subst.insert(pattern, ground);
                    Ok(true)
                }
            },
            NodeKind::Molecular { wires: pw } => {
                let g = self.node(ground)?;
                let NodeKind::Molecular { wires: gw } = &g.kind else {
                    return Ok(false);
                };
                if pw.len() != gw.len() {
                    return Ok(false);
                }
                // Wires are matched positionally per relation label; both
                // sides keep definition order within a label.
                let mut pw = pw.clone();
                let mut gw = gw.clone();
                pw.sort_by(|a, b| a.relation.as_str().cmp(b.relation.as_str()));
                gw.sort_by(|a, b| a.relation.as_str().cmp(b.relation.as_str()));
                for (a, b) in pw.iter().zip(gw.iter()) {
                    if a.relation != b.relation {
                        return Ok(false);
                    }
                    if !self.unify_into(a.target, b.target, subst)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Iterate over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Compute statistics about the network.
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            node_count: self.graph.node_count(),
            arc_count: self.graph.edge_count(),
            ..NetworkStats::default()
        };
        for node in self.nodes() {
            match node.kind {
                NodeKind::Variable => stats.variable_count += 1,
                NodeKind::Rule(_) => stats.rule_count += 1,
                _ => {}
            }
        }
        stats
    }
}

/// Statistics about a semantic network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of labeled arcs.
    pub arc_count: usize,
    /// Number of variable nodes.
    pub variable_count: usize,
    /// Number of rule nodes.
    pub rule_count: usize,
}
