#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

//! Context-sensitive forward/backward-chaining inference engine over a
//! semantic network.
//!
//! Belief changes propagate as [`Report`]s through typed, context-scoped
//! [`channel::Channel`]s into rule nodes, which aggregate them into
//! per-context, per-substitution evidence records ([`RuleUseInfo`]) and fire
//! downstream once their kind's threshold is crossed. [`Request`]s flow the
//! opposite way to drive backward-chaining derivation. Every piece of
//! evidence is scoped to one context; contexts never leak into each other.
//!
//! The graph itself comes from [`entail_core`]; this crate only reads it.
//!
//! # Example
//!
//! ```rust
//! use entail_core::{ContextStore, Network, RuleKind};
//! use entail_engine::{Engine, Polarity};
//! use std::sync::Arc;
//!
//! let mut net = Network::new();
//! let p = net.add_base("p").unwrap();
//! let q = net.add_base("q").unwrap();
//! let r = net.add_base("r").unwrap();
//! let rule = net
//!     .add_rule("p&q=>r", RuleKind::AndEntailment, vec![p, q], vec![r])
//!     .unwrap();
//!
//! let contexts = Arc::new(ContextStore::new());
//! contexts.register("actual");
//!
//! let mut engine = Engine::new(Arc::new(net), contexts).unwrap();
//! engine.submit_belief(rule, "actual", Polarity::Positive).unwrap();
//! engine.submit_belief(p, "actual", Polarity::Positive).unwrap();
//! engine.submit_belief(q, "actual", Polarity::Positive).unwrap();
//!
//! assert!(engine.holds("actual", r).unwrap());
//! ```

pub mod beliefs;
pub mod channel;
mod engine;
mod error;
pub mod evidence;
mod message;
pub mod rules;
pub mod sindex;
mod state;

pub use beliefs::{BeliefRecord, BeliefStore};
pub use channel::{Channel, ChannelKind, ChannelTable};
pub use engine::{Engine, EngineConfig, PropagationStats, QueryAnswer, QueryMatch};
pub use error::{EngineError, Result};
pub use evidence::{FlagNode, FlagNodeSet, MergeOutcome, RuleUseInfo, RuleUseInfoSet};
pub use message::{Polarity, Report, Request, SupportSet};
pub use rules::{
    all_share_vars, analyze, firing_decision, shared_var_nodes, split_antecedents, RuleAnalysis,
};
pub use sindex::{SIndex, SIndexMode};
