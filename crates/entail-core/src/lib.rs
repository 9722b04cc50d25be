#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

//! Core substrate for a semantic network: typed nodes, labeled relations,
//! variable substitutions, and named belief contexts.
//!
//! This crate provides the graph the inference engine reasons over:
//!
//! - [`Node`] / [`NodeKind`] - tagged node kinds (base, variable, molecular, rule)
//! - [`Network`] - the append-only node graph with checked construction
//! - [`Substitution`] - variable-to-term bindings
//! - [`ContextStore`] - the registry of named belief contexts
//!
//! # Example
//!
//! ```rust
//! use entail_core::{Network, RuleKind};
//!
//! let mut net = Network::new();
//! let rain = net.add_base("raining").unwrap();
//! let wet = net.add_base("streets-wet").unwrap();
//! net.add_rule("rain=>wet", RuleKind::Implication, vec![rain], vec![wet])
//!     .unwrap();
//!
//! assert_eq!(net.stats().rule_count, 1);
//! ```

mod context;
mod error;
mod network;
mod node;
mod relation;
mod subst;

pub use context::{ContextId, ContextStore};
pub use error::{Error, Result};
pub use network::{Network, NetworkStats};
pub use node::{Node, NodeId, NodeKind, RuleKind, RuleSpec, Wire};
pub use relation::Relation;
pub use subst::Substitution;

// Re-export petgraph for advanced graph operations
pub use petgraph;
