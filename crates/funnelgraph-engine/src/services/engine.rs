//! The funnel engine
//!
//! Composes the step-value calculator, split allocator, metrics aggregator,
//! and graph builder into one entry point. The engine owns a seedable
//! random-number generator so calculations can be made fully deterministic
//! in tests; each `calculate` call is otherwise independent and
//! side-effect-free.

use std::collections::HashSet;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use funnelgraph_types::{
    CalculationMetadata, CalculationOptions, CalculationResult, FunnelDefinition, FunnelError,
    FunnelResult, ValidationOutcome,
};

use super::{graph, metrics, split, step_value, ComputedSplit, ComputedStep};

/// Funnel calculation engine
pub struct FunnelEngine {
    rng: StdRng,
}

impl FunnelEngine {
    /// Engine seeded from system entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Engine with a fixed seed; identical seeds produce identical results
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Validate a funnel definition without mutating it.
    ///
    /// Calculation never proceeds on a definition that fails validation.
    pub fn validate(definition: &FunnelDefinition) -> ValidationOutcome {
        let mut errors = Vec::new();

        if definition.name.trim().is_empty() {
            errors.push("Funnel name cannot be empty".to_string());
        }

        if definition.steps.is_empty() {
            errors.push("Funnel must have at least one step".to_string());
        } else if definition.enabled_steps().next().is_none() {
            errors.push("Funnel must have at least one enabled step".to_string());
        }

        // Steps and split variations become nodes in one flat graph
        // namespace alongside the reserved entry/exit nodes, so their ids
        // must be unique across the whole definition.
        let reserved = [graph::ENTRY_NODE_ID, graph::EXIT_NODE_ID];
        let mut seen_node_ids = HashSet::new();
        for step in &definition.steps {
            if reserved.contains(&step.id.as_str()) {
                errors.push(format!("Step id '{}' is reserved", step.id));
            } else if !seen_node_ids.insert(step.id.as_str()) {
                errors.push(format!("Duplicate step id: {}", step.id));
            }

            for variation in &step.split_variations {
                if reserved.contains(&variation.id.as_str()) {
                    errors.push(format!(
                        "Split variation id '{}' in step '{}' is reserved",
                        variation.id, step.id
                    ));
                } else if !seen_node_ids.insert(variation.id.as_str()) {
                    errors.push(format!(
                        "Duplicate split variation id '{}' in step '{}'",
                        variation.id, step.id
                    ));
                }
            }
        }

        if errors.is_empty() {
            ValidationOutcome::valid()
        } else {
            ValidationOutcome::invalid(errors)
        }
    }

    /// Run a full calculation over the definition.
    ///
    /// Produces a complete, self-consistent snapshot: per-step populations,
    /// split allocations that reconcile exactly to their parent steps,
    /// metrics, insights, and the flow graph. The metric and insight
    /// sections honor `options`; the graph and metadata are always built.
    pub fn calculate(
        &mut self,
        definition: &FunnelDefinition,
        initial_population: u64,
        options: &CalculationOptions,
    ) -> FunnelResult<CalculationResult> {
        let outcome = Self::validate(definition);
        if !outcome.is_valid {
            return Err(FunnelError::Validation {
                errors: outcome.errors,
            });
        }
        if initial_population == 0 {
            return Err(FunnelError::InvalidPopulation);
        }

        let enabled: Vec<_> = definition.enabled_steps().collect();
        debug!(
            funnel = %definition.name,
            steps = enabled.len(),
            initial_population,
            "Calculating funnel"
        );

        let mut computed_steps: Vec<ComputedStep<'_>> = Vec::with_capacity(enabled.len());
        let mut previous = initial_population;
        for (index, step) in enabled.iter().copied().enumerate() {
            let mut value = step_value::next_value(previous, step, index, &mut self.rng);
            if value > previous {
                // Local self-correction, not a failure: no step may end
                // with more visitors than the step before it.
                warn!(
                    step = %step.id,
                    value,
                    previous,
                    "Step value exceeded predecessor, capping"
                );
                value = previous;
            }
            debug!(step = %step.id, index, value, "Calculated step population");
            computed_steps.push(ComputedStep {
                step,
                value,
                previous_value: previous,
            });
            previous = value;
        }

        let mut computed_splits: Vec<ComputedSplit<'_>> = Vec::new();
        if options.include_split_variations {
            for computed in &computed_steps {
                if computed.step.split_variations.is_empty() {
                    continue;
                }
                let allocated = split::allocate(
                    computed.value,
                    computed.step.split_variations.len(),
                    &mut self.rng,
                );
                for (variation, value) in computed.step.split_variations.iter().zip(allocated) {
                    computed_splits.push(ComputedSplit {
                        variation,
                        parent_step_id: &computed.step.id,
                        parent_value: computed.value,
                        value,
                    });
                }
            }
        }

        let step_metrics = if options.include_metrics || options.include_insights {
            metrics::step_metrics(&computed_steps)
        } else {
            Vec::new()
        };

        let insights = options.include_insights.then(|| {
            let funnel_type = metrics::classify_funnel_type(
                &definition.name,
                definition.description.as_deref(),
            );
            metrics::build_insights(&step_metrics, initial_population, funnel_type)
        });

        let split_variation_metrics = if options.include_metrics {
            metrics::split_metrics(&computed_splits)
        } else {
            Vec::new()
        };

        let graph = graph::build(&computed_steps, &computed_splits, initial_population)?;

        Ok(CalculationResult {
            step_metrics: if options.include_metrics {
                step_metrics
            } else {
                Vec::new()
            },
            split_variation_metrics,
            insights,
            graph,
            metadata: CalculationMetadata {
                calculated_at: Utc::now(),
                total_steps: definition.steps.len(),
                enabled_steps: enabled.len(),
                initial_population,
            },
        })
    }
}

impl Default for FunnelEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnelgraph_types::{FunnelStep, SplitVariation};

    fn three_step_definition() -> FunnelDefinition {
        FunnelDefinition::new(
            "Checkout funnel",
            vec![
                FunnelStep::new("view", "View product", 1),
                FunnelStep::new("cart", "Add to cart", 2),
                FunnelStep::new("purchase", "Complete purchase", 3),
            ],
        )
    }

    #[test]
    fn test_three_step_funnel_shape() {
        let mut engine = FunnelEngine::with_seed(1);
        let result = engine
            .calculate(&three_step_definition(), 10_000, &CalculationOptions::default())
            .expect("calculation should succeed");

        assert_eq!(result.step_metrics.len(), 3);
        assert!(result.step_metrics[0].visitor_count <= 10_000);
        assert_eq!(result.graph.nodes.len(), 5, "entry + 3 steps + exit");
        assert_eq!(result.metadata.total_steps, 3);
        assert_eq!(result.metadata.enabled_steps, 3);
        assert_eq!(result.metadata.initial_population, 10_000);
    }

    #[test]
    fn test_step_values_are_monotonically_bounded() {
        for seed in 0..50 {
            let mut engine = FunnelEngine::with_seed(seed);
            let result = engine
                .calculate(&three_step_definition(), 10_000, &CalculationOptions::default())
                .expect("calculation should succeed");

            let mut previous = 10_000;
            for metric in &result.step_metrics {
                assert!(
                    metric.visitor_count <= previous,
                    "seed {}: step '{}' exceeds its predecessor",
                    seed,
                    metric.id
                );
                previous = metric.visitor_count;
            }
        }
    }

    #[test]
    fn test_split_counts_reconcile_to_parent_step() {
        let definition = FunnelDefinition::new(
            "Split funnel",
            vec![
                FunnelStep::new("s1", "Landing page", 1),
                FunnelStep::new("s2", "Signup form", 2).with_split_variations(vec![
                    SplitVariation::new("v1", "Variant A"),
                    SplitVariation::new("v2", "Variant B"),
                    SplitVariation::new("v3", "Variant C"),
                ]),
            ],
        );

        for seed in 0..50 {
            let mut engine = FunnelEngine::with_seed(seed);
            let result = engine
                .calculate(&definition, 10_000, &CalculationOptions::default())
                .expect("calculation should succeed");

            let step_value = result.step_metrics[1].visitor_count;
            let split_sum: u64 = result
                .split_variation_metrics
                .iter()
                .map(|m| m.visitor_count)
                .sum();
            assert_eq!(result.split_variation_metrics.len(), 3);
            assert_eq!(
                split_sum, step_value,
                "seed {}: split counts must sum exactly to the parent step",
                seed
            );
        }
    }

    #[test]
    fn test_conversion_and_drop_off_identity() {
        let mut engine = FunnelEngine::with_seed(11);
        let result = engine
            .calculate(&three_step_definition(), 10_000, &CalculationOptions::default())
            .expect("calculation should succeed");

        for metric in &result.step_metrics {
            if metric.previous_step_value > 0 {
                assert!(
                    (metric.conversion_rate + metric.drop_off_rate - 100.0).abs() < 1e-9,
                    "step '{}' violates the conversion identity",
                    metric.id
                );
            }
        }
    }

    #[test]
    fn test_validation_rejects_funnel_with_no_enabled_steps() {
        let definition = FunnelDefinition::new(
            "Disabled funnel",
            vec![
                FunnelStep::new("s1", "Step 1", 1).disabled(),
                FunnelStep::new("s2", "Step 2", 2).disabled(),
            ],
        );

        let outcome = FunnelEngine::validate(&definition);
        assert!(!outcome.is_valid);
        assert!(
            outcome.errors.iter().any(|e| e.contains("enabled")),
            "error must mention 'enabled', got {:?}",
            outcome.errors
        );
    }

    #[test]
    fn test_validation_rejects_duplicate_step_ids() {
        let definition = FunnelDefinition::new(
            "Duplicate funnel",
            vec![
                FunnelStep::new("same", "Step 1", 1),
                FunnelStep::new("same", "Step 2", 2),
            ],
        );

        let outcome = FunnelEngine::validate(&definition);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.iter().any(|e| e.contains("same")));
    }

    #[test]
    fn test_validation_rejects_reserved_step_id() {
        let definition = FunnelDefinition::new(
            "Reserved funnel",
            vec![
                FunnelStep::new("entry", "Masquerades as the entry node", 1),
                FunnelStep::new("s2", "Step 2", 2),
            ],
        );

        let outcome = FunnelEngine::validate(&definition);
        assert!(!outcome.is_valid);
        assert!(
            outcome.errors.iter().any(|e| e.contains("reserved")),
            "error must call out the reserved id, got {:?}",
            outcome.errors
        );

        let mut engine = FunnelEngine::with_seed(1);
        let result = engine.calculate(&definition, 1000, &CalculationOptions::default());
        assert!(
            matches!(result, Err(FunnelError::Validation { .. })),
            "calculation must refuse a definition with a reserved step id"
        );
    }

    #[test]
    fn test_validation_rejects_split_id_colliding_with_step_id() {
        let definition = FunnelDefinition::new(
            "Colliding funnel",
            vec![
                FunnelStep::new("s1", "Step 1", 1)
                    .with_split_variations(vec![SplitVariation::new("s2", "Variant A")]),
                FunnelStep::new("s2", "Step 2", 2),
            ],
        );

        let outcome = FunnelEngine::validate(&definition);
        assert!(
            !outcome.is_valid,
            "a split id equal to a step id would duplicate a graph node"
        );
        assert!(outcome.errors.iter().any(|e| e.contains("s2")));
    }

    #[test]
    fn test_calculated_graph_node_ids_are_unique() {
        let definition = FunnelDefinition::new(
            "Unique nodes",
            vec![
                FunnelStep::new("s1", "Step 1", 1),
                FunnelStep::new("s2", "Step 2", 2).with_split_variations(vec![
                    SplitVariation::new("v1", "A"),
                    SplitVariation::new("v2", "B"),
                ]),
            ],
        );

        let mut engine = FunnelEngine::with_seed(13);
        let result = engine
            .calculate(&definition, 1000, &CalculationOptions::default())
            .expect("calculation should succeed");

        let ids: std::collections::HashSet<_> =
            result.graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids.len(),
            result.graph.nodes.len(),
            "every graph node id must be unique"
        );
    }

    #[test]
    fn test_validation_rejects_empty_name_and_no_steps() {
        let definition = FunnelDefinition::new("  ", vec![]);
        let outcome = FunnelEngine::validate(&definition);
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors.len(), 2);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let definition = three_step_definition();
        let first = FunnelEngine::validate(&definition);
        let second = FunnelEngine::validate(&definition);
        assert_eq!(first.is_valid, second.is_valid);
        assert_eq!(first.errors, second.errors);
    }

    #[test]
    fn test_calculation_refuses_invalid_definition() {
        let mut engine = FunnelEngine::with_seed(1);
        let definition = FunnelDefinition::new("Bad", vec![]);
        let result = engine.calculate(&definition, 1000, &CalculationOptions::default());
        assert!(matches!(result, Err(FunnelError::Validation { .. })));
    }

    #[test]
    fn test_calculation_refuses_zero_population() {
        let mut engine = FunnelEngine::with_seed(1);
        let result = engine.calculate(
            &three_step_definition(),
            0,
            &CalculationOptions::default(),
        );
        assert!(matches!(result, Err(FunnelError::InvalidPopulation)));
    }

    #[test]
    fn test_single_step_overall_conversion() {
        let definition = FunnelDefinition::new(
            "Single step",
            vec![FunnelStep::new("only", "Only step", 1)],
        );
        let mut engine = FunnelEngine::with_seed(21);
        let result = engine
            .calculate(&definition, 500, &CalculationOptions::default())
            .expect("calculation should succeed");

        let expected = result.step_metrics[0].visitor_count as f64 / 500.0 * 100.0;
        let insights = result.insights.expect("insights requested");
        assert!(
            (insights.overall_conversion_rate - expected).abs() < 1e-9,
            "overall conversion must be final step over initial population"
        );
    }

    #[test]
    fn test_disabled_steps_are_excluded_entirely() {
        let definition = FunnelDefinition::new(
            "Partially disabled",
            vec![
                FunnelStep::new("s1", "Step 1", 1),
                FunnelStep::new("s2", "Step 2", 2).disabled(),
                FunnelStep::new("s3", "Step 3", 3),
            ],
        );
        let mut engine = FunnelEngine::with_seed(5);
        let result = engine
            .calculate(&definition, 1000, &CalculationOptions::default())
            .expect("calculation should succeed");

        assert_eq!(result.step_metrics.len(), 2);
        assert!(result.graph.nodes.iter().all(|n| n.id != "s2"));
        assert_eq!(result.metadata.total_steps, 3);
        assert_eq!(result.metadata.enabled_steps, 2);
    }

    #[test]
    fn test_options_omit_requested_sections() {
        let definition = FunnelDefinition::new(
            "Options funnel",
            vec![
                FunnelStep::new("s1", "Step 1", 1).with_split_variations(vec![
                    SplitVariation::new("v1", "A"),
                    SplitVariation::new("v2", "B"),
                ]),
            ],
        );
        let options = CalculationOptions {
            include_split_variations: false,
            include_metrics: false,
            include_insights: false,
        };

        let mut engine = FunnelEngine::with_seed(9);
        let result = engine
            .calculate(&definition, 1000, &options)
            .expect("calculation should succeed");

        assert!(result.step_metrics.is_empty());
        assert!(result.split_variation_metrics.is_empty());
        assert!(result.insights.is_none());
        assert!(
            result.graph.nodes.iter().all(|n| n.is_split.is_none()),
            "split nodes must not appear when splits are excluded"
        );
        assert_eq!(result.metadata.initial_population, 1000);
    }

    #[test]
    fn test_same_seed_produces_identical_results() {
        let definition = three_step_definition();
        let options = CalculationOptions::default();

        let a = FunnelEngine::with_seed(777)
            .calculate(&definition, 10_000, &options)
            .expect("calculation should succeed");
        let b = FunnelEngine::with_seed(777)
            .calculate(&definition, 10_000, &options)
            .expect("calculation should succeed");

        let counts = |r: &CalculationResult| {
            r.step_metrics
                .iter()
                .map(|m| m.visitor_count)
                .collect::<Vec<_>>()
        };
        assert_eq!(counts(&a), counts(&b));
        assert_eq!(a.graph.nodes.len(), b.graph.nodes.len());
        assert_eq!(a.graph.links.len(), b.graph.links.len());
    }

    #[test]
    fn test_graph_referential_integrity() {
        let definition = FunnelDefinition::new(
            "Integrity funnel",
            vec![
                FunnelStep::new("s1", "Step 1", 1),
                FunnelStep::new("s2", "Step 2", 2).with_split_variations(vec![
                    SplitVariation::new("v1", "A"),
                    SplitVariation::new("v2", "B"),
                ]),
                FunnelStep::new("s3", "Step 3", 3),
            ],
        );

        for seed in 0..20 {
            let mut engine = FunnelEngine::with_seed(seed);
            let result = engine
                .calculate(&definition, 10_000, &CalculationOptions::default())
                .expect("calculation should succeed");

            let ids: std::collections::HashSet<_> = result
                .graph
                .nodes
                .iter()
                .map(|n| n.id.as_str())
                .collect();
            for link in &result.graph.links {
                assert!(ids.contains(link.source.as_str()), "dangling source");
                assert!(ids.contains(link.target.as_str()), "dangling target");
                assert!(link.value > 0, "link values must be positive");
            }
        }
    }
}
