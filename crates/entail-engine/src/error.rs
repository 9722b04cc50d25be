use entail_core::NodeId;
use thiserror::Error;

/// Errors that can occur during inference.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Network or context error from the substrate.
    #[error(transparent)]
    Core(#[from] entail_core::Error),
    /// An evidence record could not be combined with incoming evidence.
    /// This indicates a broken invariant elsewhere; it is not retryable.
    #[error("evidence corruption: {0}")]
    EvidenceCorruption(String),
    /// The context exists but has been logically retracted.
    #[error("context `{0}` is retired")]
    RetiredContext(String),
    /// Submitted beliefs must be ground.
    #[error("node {0} has free variables and cannot be believed directly")]
    NotGround(NodeId),
    /// Propagation did not reach quiescence within the configured bound.
    #[error("propagation exceeded {0} scheduling rounds")]
    PropagationLimit(usize),
    /// An operation the engine does not support.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for entail-engine.
pub type Result<T> = std::result::Result<T, EngineError>;
