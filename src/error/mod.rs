//! Error types for graph-splice
//!
//! This module defines all error types used throughout the crate.
//!
//! Structural contract violations (bad scope, bad destination, disconnected
//! rewrite) are fatal and propagate immediately. Missing individual mappings
//! in a [`ResultInfo`](crate::transform::ResultInfo) lookup are expected and
//! surface as `Option`/fallback values, never as errors.

use thiserror::Error;

/// Main error type for subgraph transformation operations
#[derive(Error, Debug)]
pub enum TransformError {
    /// Destination graph cannot accept the requested operation
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// A name does not fall under the declared source scope
    ///
    /// This is a caller contract violation. When it surfaces mid-traversal
    /// the destination graph may already contain partially created nodes;
    /// there is no rollback.
    #[error("Name `{name}` does not belong to source scope `{scope}`")]
    ScopeMismatch {
        /// The offending name
        name: String,
        /// The declared source scope prefix
        scope: String,
    },

    /// Targeted replacement found no path between replacements and targets
    #[error("Targets and replacements are not connected")]
    DisconnectedRewrite,

    /// An operation id does not resolve in the given graph
    #[error("Unknown operation {0}")]
    UnknownOp(String),

    /// A tensor id does not resolve in the given graph
    #[error("Unknown tensor {0}")]
    UnknownTensor(String),

    /// A subgraph view violates its boundary invariant
    #[error("Invalid subgraph view: {0}")]
    InvalidView(String),
}

/// Result type alias for transformation operations
pub type TransformResult<T> = Result<T, TransformError>;
