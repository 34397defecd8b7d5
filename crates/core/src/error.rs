//! Error types for the qanun service.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, corpus and index state, query
//! validation, and the three remote gateway stages.

use thiserror::Error;

/// Pipeline stage that talks to a remote gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStage {
    Embedding,
    Rerank,
    Generation,
}

impl std::fmt::Display for GatewayStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GatewayStage::Embedding => "embedding",
            GatewayStage::Rerank => "rerank",
            GatewayStage::Generation => "generation",
        };
        f.write_str(name)
    }
}

/// Unified error type for the qanun service.
///
/// All functions in the application return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Rejected user input (empty or blank query)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Query embedding length differs from the index dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index file is absent, unreadable or holds no vectors
    #[error("Index not ready: {0}")]
    IndexNotReady(String),

    /// Corpus file holds no chunks
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    /// Corpus and index are out of positional sync
    #[error("Corpus/index mismatch: {0}")]
    CorpusIndexMismatch(String),

    /// A gateway call exceeded its stage timeout
    #[error("Gateway timeout in {stage} stage")]
    GatewayTimeout { stage: GatewayStage },

    /// A gateway answered with a body the service cannot decode
    #[error("Malformed {stage} gateway response: {detail}")]
    GatewayMalformed { stage: GatewayStage, detail: String },

    /// Transport failure or non-success status from a gateway
    #[error("Gateway error in {stage} stage: {detail}")]
    Gateway {
        stage: GatewayStage,
        status: Option<u16>,
        detail: String,
    },
}

impl AppError {
    /// Whether a failed gateway call may be attempted again.
    ///
    /// Timeouts and malformed responses are transient by contract.
    /// Transport failures (no status) and 5xx statuses are transient;
    /// 4xx statuses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::GatewayTimeout { .. } => true,
            AppError::GatewayMalformed { .. } => true,
            AppError::Gateway { status, .. } => match status {
                Some(code) => *code >= 500,
                None => true,
            },
            _ => false,
        }
    }

    /// The gateway stage a failure belongs to, if any.
    pub fn gateway_stage(&self) -> Option<GatewayStage> {
        match self {
            AppError::GatewayTimeout { stage }
            | AppError::GatewayMalformed { stage, .. }
            | AppError::Gateway { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
