//! Metric aggregation
//!
//! Computes conversion, drop-off, and funnel-level insights from the
//! calculated per-step and per-split populations. Everything here is pure
//! arithmetic over the computed values plus a keyword classifier for the
//! funnel category.

use funnelgraph_types::{
    FunnelInsights, FunnelType, SplitVariationMetrics, StepMetrics, StepReference,
};

use super::{ComputedSplit, ComputedStep};

/// Conversion rate of `value` against `previous`, in percent.
///
/// By convention a zero predecessor yields a 0% conversion rate (and thus
/// a 100% drop-off rate).
fn conversion_rate(value: u64, previous: u64) -> f64 {
    if previous == 0 {
        0.0
    } else {
        value as f64 / previous as f64 * 100.0
    }
}

/// Per-step metrics, in enabled-step order
pub fn step_metrics(computed: &[ComputedStep<'_>]) -> Vec<StepMetrics> {
    computed
        .iter()
        .map(|c| {
            let rate = conversion_rate(c.value, c.previous_value);
            StepMetrics {
                id: c.step.id.clone(),
                name: c.step.name.clone(),
                visitor_count: c.value,
                conversion_rate: rate,
                drop_off_rate: 100.0 - rate,
                drop_off_count: c.previous_value.saturating_sub(c.value),
                previous_step_value: c.previous_value,
                is_optional: !c.step.is_required,
            }
        })
        .collect()
}

/// Per-split metrics, relative to each split's parent step
pub fn split_metrics(computed: &[ComputedSplit<'_>]) -> Vec<SplitVariationMetrics> {
    computed
        .iter()
        .map(|c| {
            let rate = conversion_rate(c.value, c.parent_value);
            SplitVariationMetrics {
                id: c.variation.id.clone(),
                name: c.variation.name.clone(),
                visitor_count: c.value,
                conversion_rate: rate,
                drop_off_rate: 100.0 - rate,
                drop_off_count: c.parent_value.saturating_sub(c.value),
                parent_step_id: c.parent_step_id.to_string(),
                proportion_of_parent: if c.parent_value == 0 {
                    0.0
                } else {
                    c.value as f64 / c.parent_value as f64
                },
            }
        })
        .collect()
}

/// Classify a funnel into a category by keyword match on its name and
/// description. Defaults to ecommerce when nothing matches.
pub fn classify_funnel_type(name: &str, description: Option<&str>) -> FunnelType {
    let text = format!("{} {}", name, description.unwrap_or("")).to_lowercase();

    let categories: [(&[&str], FunnelType); 5] = [
        (
            &["saas", "trial", "subscription", "software"],
            FunnelType::Saas,
        ),
        (
            &["lead", "demo", "contact", "quote", "webinar"],
            FunnelType::LeadGen,
        ),
        (
            &["mobile", "app install", "app store", "onboarding"],
            FunnelType::MobileApp,
        ),
        (
            &["content", "blog", "article", "newsletter"],
            FunnelType::Content,
        ),
        (
            &["support", "ticket", "help center", "faq"],
            FunnelType::Support,
        ),
    ];

    for (keywords, funnel_type) in categories {
        if keywords.iter().any(|k| text.contains(k)) {
            return funnel_type;
        }
    }
    FunnelType::Ecommerce
}

/// Funnel-level insights derived from the step metrics
pub fn build_insights(
    metrics: &[StepMetrics],
    initial_population: u64,
    funnel_type: FunnelType,
) -> FunnelInsights {
    let final_value = metrics.last().map(|m| m.visitor_count).unwrap_or(0);
    let overall_conversion_rate = conversion_rate(final_value, initial_population);
    let total_drop_off = initial_population.saturating_sub(final_value);

    // Ties break to the first occurrence in step order, so comparisons
    // are strict.
    let best_converting_step = metrics
        .iter()
        .fold(None::<&StepMetrics>, |best, m| match best {
            Some(b) if b.conversion_rate >= m.conversion_rate => Some(b),
            _ => Some(m),
        })
        .map(|m| StepReference {
            id: m.id.clone(),
            name: m.name.clone(),
            rate: m.conversion_rate,
        });

    let highest_drop_off_step = metrics
        .iter()
        .fold(None::<&StepMetrics>, |worst, m| match worst {
            Some(w) if w.drop_off_rate >= m.drop_off_rate => Some(w),
            _ => Some(m),
        })
        .map(|m| StepReference {
            id: m.id.clone(),
            name: m.name.clone(),
            rate: m.drop_off_rate,
        });

    let mut recommendations = Vec::new();
    if let Some(worst) = &highest_drop_off_step {
        recommendations.push(format!(
            "Focus on '{}' first: it loses {:.1}% of its audience, the most of any step",
            worst.name, worst.rate
        ));
    }
    if let Some(best) = &best_converting_step {
        recommendations.push(format!(
            "'{}' converts at {:.1}%; study what works there and apply it to weaker steps",
            best.name, best.rate
        ));
    }
    recommendations.push(funnel_type.suggestion().to_string());

    FunnelInsights {
        overall_conversion_rate,
        total_drop_off,
        best_converting_step,
        highest_drop_off_step,
        funnel_type,
        potential_revenue_lost: total_drop_off as f64 * funnel_type.revenue_per_conversion(),
        recommendations,
    }
}
