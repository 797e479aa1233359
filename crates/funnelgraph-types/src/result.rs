//! Calculation result types
//!
//! A `CalculationResult` is produced atomically by one engine call and is a
//! complete, self-consistent snapshot. It is never mutated after return.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::UtcDateTime;

/// Options controlling which output sections a calculation produces
///
/// The flow graph and result metadata are always produced; the metric and
/// insight sections can be omitted to save work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct CalculationOptions {
    /// Allocate split variations and report their metrics
    pub include_split_variations: bool,
    /// Compute per-step and per-split metric lists
    pub include_metrics: bool,
    /// Compute funnel-level insights
    pub include_insights: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            include_split_variations: true,
            include_metrics: true,
            include_insights: true,
        }
    }
}

/// Complete result of a funnel calculation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalculationResult {
    /// Per-step metrics, in enabled-step order
    pub step_metrics: Vec<StepMetrics>,
    /// Per-split-variation metrics
    pub split_variation_metrics: Vec<SplitVariationMetrics>,
    /// Funnel-level summary; `None` when insights were not requested
    pub insights: Option<FunnelInsights>,
    /// Directed flow graph for the rendering layer
    pub graph: FlowGraph,
    /// Calculation metadata
    pub metadata: CalculationMetadata,
}

/// Metrics for a single funnel step
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StepMetrics {
    /// Step identifier from the definition
    pub id: String,
    /// Step name
    pub name: String,
    /// Calculated population count for this step
    pub visitor_count: u64,
    /// Percentage of the previous step's population that reached this step
    pub conversion_rate: f64,
    /// `100 - conversion_rate`
    pub drop_off_rate: f64,
    /// Population lost between the previous step and this one
    pub drop_off_count: u64,
    /// The previous step's population (the initial population for step one)
    pub previous_step_value: u64,
    /// Whether the step was marked optional in the definition
    pub is_optional: bool,
}

/// Metrics for a single split variation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SplitVariationMetrics {
    /// Variation identifier from the definition
    pub id: String,
    /// Variation name
    pub name: String,
    /// Population allocated to this variation
    pub visitor_count: u64,
    /// Percentage of the parent step's population in this variation
    pub conversion_rate: f64,
    /// `100 - conversion_rate`
    pub drop_off_rate: f64,
    /// Parent-step population not in this variation
    pub drop_off_count: u64,
    /// Identifier of the owning step
    pub parent_step_id: String,
    /// This variation's share of the parent population, in `[0, 1]`
    pub proportion_of_parent: f64,
}

/// Reference to a step inside the insights summary
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StepReference {
    /// Step identifier
    pub id: String,
    /// Step name
    pub name: String,
    /// The rate that earned the step this reference (conversion rate for
    /// the best step, drop-off rate for the worst)
    pub rate: f64,
}

/// Funnel-level summary produced by the metrics aggregator
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunnelInsights {
    /// Final-step population as a percentage of the initial population
    pub overall_conversion_rate: f64,
    /// Initial population minus final-step population
    pub total_drop_off: u64,
    /// Step with the highest conversion rate (first occurrence wins ties)
    pub best_converting_step: Option<StepReference>,
    /// Step with the highest drop-off rate (first occurrence wins ties)
    pub highest_drop_off_step: Option<StepReference>,
    /// Categorical funnel type classified from the definition text
    pub funnel_type: FunnelType,
    /// Estimated revenue lost to drop-off, using a per-type lookup
    pub potential_revenue_lost: f64,
    /// Deterministic template recommendations
    pub recommendations: Vec<String>,
}

/// Categorical funnel type, classified from the definition name/description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FunnelType {
    Ecommerce,
    Saas,
    LeadGen,
    MobileApp,
    Content,
    Support,
}

impl FunnelType {
    /// Assumed revenue per conversion, used for the revenue-impact estimate
    pub fn revenue_per_conversion(&self) -> f64 {
        match self {
            FunnelType::Ecommerce => 75.0,
            FunnelType::Saas => 299.0,
            FunnelType::LeadGen => 150.0,
            FunnelType::MobileApp => 25.0,
            FunnelType::Content => 10.0,
            FunnelType::Support => 45.0,
        }
    }

    /// Category-specific suggestion appended to the recommendations list
    pub fn suggestion(&self) -> &'static str {
        match self {
            FunnelType::Ecommerce => {
                "Consider cart-abandonment emails and a streamlined guest checkout"
            }
            FunnelType::Saas => "Consider shortening the trial signup and adding onboarding nudges",
            FunnelType::LeadGen => "Consider reducing form fields and adding social proof",
            FunnelType::MobileApp => {
                "Consider deferring permission prompts until after first value"
            }
            FunnelType::Content => "Consider stronger calls to action at the end of articles",
            FunnelType::Support => "Consider surfacing self-service answers before ticket forms",
        }
    }
}

/// Directed flow graph handed to the visualization layer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FlowGraph {
    /// All nodes: entry, each enabled step, each split variation, exit
    pub nodes: Vec<GraphNode>,
    /// Directed links between nodes; every endpoint resolves to a node
    pub links: Vec<GraphLink>,
}

/// A node in the flow graph
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GraphNode {
    /// Node identifier (step/split id, or the reserved `entry`/`exit` ids)
    pub id: String,
    /// Display name
    pub name: String,
    /// Population count at this node
    pub value: u64,
    /// Set on step nodes for optional steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_optional: Option<bool>,
    /// Set on split-variation nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_split: Option<bool>,
    /// Owning step id, set on split-variation nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// A directed link in the flow graph
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GraphLink {
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Population flowing along this link; always positive
    pub value: u64,
}

/// Metadata attached to every calculation result
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalculationMetadata {
    /// When the calculation ran
    #[schema(value_type = String)]
    pub calculated_at: UtcDateTime,
    /// Total steps in the definition, including disabled ones
    pub total_steps: usize,
    /// Steps that participated in the calculation
    pub enabled_steps: usize,
    /// The initial population the calculation started from
    pub initial_population: u64,
}
