//! Error types for the funnelgraph engine

use thiserror::Error;

/// Result type for funnel operations
pub type FunnelResult<T> = Result<T, FunnelError>;

/// Errors that can occur during funnel calculation
#[derive(Error, Debug)]
pub enum FunnelError {
    /// The definition failed pre-flight validation; calculation never ran
    #[error("Invalid funnel definition: {}", errors.join("; "))]
    Validation {
        /// One entry per failed validation rule
        errors: Vec<String>,
    },

    /// A graph link references a node id absent from the node list.
    /// This is an internal invariant violation, not bad input.
    #[error("Graph link references missing node: {link_source} -> {link_target}")]
    ReferentialIntegrity {
        /// Link source node id
        link_source: String,
        /// Link target node id
        link_target: String,
    },

    /// The initial population must be positive
    #[error("Initial population must be greater than zero")]
    InvalidPopulation,
}
