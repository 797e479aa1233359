//! Shared types for the funnelgraph calculation engine
//!
//! Normalized representation of funnel definitions (input) and calculation
//! results (output). The engine crate consumes these; no rendering or
//! persistence concerns live here.

pub mod definition;
pub mod error;
pub mod result;
pub mod validation;

pub use definition::{FunnelDefinition, FunnelStep, SplitVariation};
pub use error::{FunnelError, FunnelResult};
pub use result::{
    CalculationMetadata, CalculationOptions, CalculationResult, FlowGraph, FunnelInsights,
    FunnelType, GraphLink, GraphNode, SplitVariationMetrics, StepMetrics, StepReference,
};
pub use validation::ValidationOutcome;

/// Standard datetime type used across all funnelgraph crates
pub type UtcDateTime = chrono::DateTime<chrono::Utc>;
