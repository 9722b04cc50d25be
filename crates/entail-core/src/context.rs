//! Named belief contexts and the process-wide context registry.

use crate::{Error, NodeId, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Unique identifier for a registered context.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ContextId(pub u32);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug)]
struct ContextEntry {
    name: String,
    live: bool,
    hypotheses: BTreeSet<NodeId>,
}

/// The registry of named, independently-addressable belief contexts.
///
/// This is the inference core's window onto the belief-revision layer: it
/// resolves names to context identities and records which hypotheses are
/// asserted in each context. Context identity is immutable once registered;
/// retiring a context flips liveness only, so in-flight messages scoped to it
/// are dropped at their effect points rather than aborted.
///
/// Lookups that miss fail loudly: there is no null context to operate on.
#[derive(Debug, Default)]
pub struct ContextStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<ContextEntry>,
    by_name: HashMap<String, ContextId>,
}

impl ContextStore {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a context name, returning its identity. Idempotent: an
    /// already-registered name resolves to the same identity.
    pub fn register(&self, name: impl Into<String>) -> ContextId {
        let name = name.into();
        let mut inner = self.inner.write();
        if let Some(&id) = inner.by_name.get(&name) {
            return id;
        }
        let id = ContextId(inner.entries.len() as u32);
        inner.entries.push(ContextEntry {
            name: name.clone(),
            live: true,
            hypotheses: BTreeSet::new(),
        });
        inner.by_name.insert(name, id);
        id
    }

    /// Resolve a context name to its identity, failing loudly on a miss.
    pub fn resolve(&self, name: &str) -> Result<ContextId> {
        self.inner
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownContext(name.to_string()))
    }

    /// The name of a registered context.
    pub fn name(&self, id: ContextId) -> Result<String> {
        self.inner
            .read()
            .entries
            .get(id.0 as usize)
            .map(|e| e.name.clone())
            .ok_or_else(|| Error::UnknownContext(id.to_string()))
    }

    /// Whether the context is still live.
    pub fn is_live(&self, id: ContextId) -> bool {
        self.inner
            .read()
            .entries
            .get(id.0 as usize)
            .map_or(false, |e| e.live)
    }

    /// Logically retract a context. In-flight work scoped to it is not
    /// aborted; emission points must check liveness.
    pub fn retire(&self, name: &str) -> Result<()> {
        let id = self.resolve(name)?;
        self.inner.write().entries[id.0 as usize].live = false;
        Ok(())
    }

    /// Record `node` as a hypothesis of the context.
    pub fn assert_hypothesis(&self, id: ContextId, node: NodeId) -> Result<()> {
        let mut inner = self.inner.write();
        let entry = inner
            .entries
            .get_mut(id.0 as usize)
            .ok_or_else(|| Error::UnknownContext(id.to_string()))?;
        entry.hypotheses.insert(node);
        Ok(())
    }

    /// Whether `node` is asserted as a hypothesis of the context.
    pub fn is_asserted(&self, id: ContextId, node: NodeId) -> bool {
        self.inner
            .read()
            .entries
            .get(id.0 as usize)
            .map_or(false, |e| e.hypotheses.contains(&node))
    }

    /// The hypotheses of the context.
    pub fn hypotheses(&self, id: ContextId) -> Result<BTreeSet<NodeId>> {
        self.inner
            .read()
            .entries
            .get(id.0 as usize)
            .map(|e| e.hypotheses.clone())
            .ok_or_else(|| Error::UnknownContext(id.to_string()))
    }

    /// Number of registered contexts.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether no context has been registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let store = ContextStore::new();
        let c1 = store.register("ctx1");
        let c2 = store.register("ctx1");
        assert_eq!(c1, c2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_resolve_miss_fails_loudly() {
        let store = ContextStore::new();
        store.register("ctx1");
        assert!(matches!(
            store.resolve("nope"),
            Err(Error::UnknownContext(_))
        ));
    }

    #[test]
    fn test_hypotheses_are_per_context() {
        let store = ContextStore::new();
        let c1 = store.register("c1");
        let c2 = store.register("c2");
        store.assert_hypothesis(c1, NodeId(7)).unwrap();

        assert!(store.is_asserted(c1, NodeId(7)));
        assert!(!store.is_asserted(c2, NodeId(7)));
    }

    #[test]
    fn test_retire() {
        let store = ContextStore::new();
        let c1 = store.register("c1");
        assert!(store.is_live(c1));
        store.retire("c1").unwrap();
        assert!(!store.is_live(c1));
        // Identity survives retirement.
        assert_eq!(store.resolve("c1").unwrap(), c1);
    }
}
