//! Funnel definition types
//!
//! A `FunnelDefinition` is the immutable input to the engine: an ordered
//! sequence of steps, each optionally branching into split variations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A complete funnel definition
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunnelDefinition {
    /// Funnel name (feeds funnel-type classification)
    pub name: String,
    /// Optional free-text description (also feeds classification)
    pub description: Option<String>,
    /// Ordered steps; order defines the flow sequence
    pub steps: Vec<FunnelStep>,
}

impl FunnelDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<FunnelStep>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Enabled steps in definition order
    pub fn enabled_steps(&self) -> impl Iterator<Item = &FunnelStep> {
        self.steps.iter().filter(|s| s.is_enabled)
    }
}

/// A single step in a funnel
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunnelStep {
    /// Unique, stable step identifier
    pub id: String,
    /// Human-readable step name
    pub name: String,
    /// 1-based position in the funnel
    pub order: i32,
    /// Disabled steps are excluded from calculation and the graph
    pub is_enabled: bool,
    /// Optional steps use lower conversion-rate heuristics
    pub is_required: bool,
    /// Opaque trigger/event description; consumed only to classify the
    /// step type, never evaluated against real data
    pub conditions: Option<serde_json::Value>,
    /// Alternative sub-paths that partition this step's population
    #[serde(default)]
    pub split_variations: Vec<SplitVariation>,
}

impl FunnelStep {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            is_enabled: true,
            is_required: true,
            conditions: None,
            split_variations: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }

    pub fn with_conditions(mut self, conditions: serde_json::Value) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn with_split_variations(mut self, variations: Vec<SplitVariation>) -> Self {
        self.split_variations = variations;
        self
    }

    /// Text the step-type classifier matches against: the trigger
    /// description when present, otherwise the step name.
    pub fn trigger_text(&self) -> String {
        match &self.conditions {
            Some(conditions) => format!("{} {}", self.name, conditions),
            None => self.name.clone(),
        }
    }
}

/// An alternative sub-path within a step
///
/// Splits partition their parent step's population exactly; they cannot
/// themselves split further.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SplitVariation {
    /// Unique variation identifier
    pub id: String,
    /// Human-readable variation name
    pub name: String,
    /// Opaque trigger/event description, same shape as step conditions
    pub conditions: Option<serde_json::Value>,
}

impl SplitVariation {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            conditions: None,
        }
    }
}
