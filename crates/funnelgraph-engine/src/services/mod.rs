//! Engine services
//!
//! `step_value` and `split` are pure leaf functions; `metrics` and `graph`
//! consume their outputs; `engine` composes everything and is the only
//! public surface.

pub mod engine;
pub mod graph;
pub mod metrics;
pub mod split;
pub mod step_value;

use funnelgraph_types::{FunnelStep, SplitVariation};

/// A step's calculated population, paired with its predecessor's value
#[derive(Debug)]
pub struct ComputedStep<'a> {
    pub step: &'a FunnelStep,
    pub value: u64,
    /// The previous enabled step's value, or the initial population for
    /// the first step
    pub previous_value: u64,
}

/// A split variation's allocated population
#[derive(Debug)]
pub struct ComputedSplit<'a> {
    pub variation: &'a SplitVariation,
    pub parent_step_id: &'a str,
    /// The owning step's calculated value
    pub parent_value: u64,
    pub value: u64,
}
