//! Error types for the launcher
//!
//! Open failures never escape the provisioner; everything else is returned
//! to the immediate caller.

use thiserror::Error;

use crate::bootstrap::Stage;

/// Failure to open a durable backend. Absorbed by the provisioner.
#[derive(Debug, Clone, Error)]
pub enum OpenError {
    /// The host has no usable persistent storage at all
    #[error("persistent storage unavailable: {0}")]
    Unavailable(String),
    /// Storage exists but open or schema upgrade failed
    #[error("can't open cache database '{name}': {reason}")]
    Failed { name: String, reason: String },
}

/// Failure of a single operation against an opened store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store is closed")]
    Closed,
    #[error("can't start transaction for key '{key}': {reason}")]
    Transaction { key: String, reason: String },
    #[error("request for key '{key}' failed: {reason}")]
    Request { key: String, reason: String },
    #[error("can't decode value for key '{key}': {reason}")]
    Decode { key: String, reason: String },
}

/// Failure reported by the engine's entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("engine module has no '{0}' entry point")]
    MissingEntryPoint(String),
    #[error("engine call '{name}' threw: {reason}")]
    Call { name: String, reason: String },
    #[error("engine rejected write to '{path}': {reason}")]
    Rejected { path: String, reason: String },
}

/// Staging into a payload the bootstrap already consumed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("pending payload already consumed, can't stage '{0}'")]
    Sealed(String),
}

/// Unrecoverable bootstrap failure
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("bootstrap stage {stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: EngineError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BootstrapError {
    /// Stage the failure happened in
    pub fn stage(&self) -> Stage {
        match self {
            BootstrapError::Stage { stage, .. } => *stage,
            BootstrapError::Store(_) => Stage::Persisted,
        }
    }
}
