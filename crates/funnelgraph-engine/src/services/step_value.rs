//! Per-step population calculation
//!
//! Samples a bounded conversion rate for each step and applies it to the
//! previous step's population. Rates depend on the step's type bucket,
//! whether the step is required, and its position in the enabled-step
//! sequence: later steps get a decayed maximum rate, encoding that funnels
//! get harder to pass as they progress.

use funnelgraph_types::FunnelStep;
use rand::Rng;

/// Maximum-rate decay per enabled-step position, in percentage points
const DECAY_PER_POSITION: f64 = 5.0;

/// Conversion-rate range for optional steps, regardless of type bucket
const OPTIONAL_RANGE: (f64, f64) = (10.0, 40.0);

/// Coarse step-type bucket, classified from the step's trigger description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    View,
    Cart,
    Checkout,
    Purchase,
    Signup,
    Generic,
}

impl StepType {
    /// Base conversion-rate range `(min, max)` in percent, for required steps
    fn base_range(&self) -> (f64, f64) {
        match self {
            StepType::View => (40.0, 70.0),
            StepType::Cart => (30.0, 60.0),
            StepType::Checkout => (35.0, 65.0),
            StepType::Purchase => (45.0, 70.0),
            StepType::Signup => (30.0, 55.0),
            StepType::Generic => (30.0, 70.0),
        }
    }
}

/// Classify a step into a type bucket by keyword match on its trigger text
pub fn classify_step_type(trigger_text: &str) -> StepType {
    let text = trigger_text.to_lowercase();
    if ["cart", "basket", "add to"].iter().any(|k| text.contains(k)) {
        StepType::Cart
    } else if ["checkout", "payment", "billing", "shipping"]
        .iter()
        .any(|k| text.contains(k))
    {
        StepType::Checkout
    } else if ["purchase", "order", "buy", "confirm"]
        .iter()
        .any(|k| text.contains(k))
    {
        StepType::Purchase
    } else if ["signup", "sign up", "register", "subscribe"]
        .iter()
        .any(|k| text.contains(k))
    {
        StepType::Signup
    } else if ["view", "visit", "page", "landing", "browse"]
        .iter()
        .any(|k| text.contains(k))
    {
        StepType::View
    } else {
        StepType::Generic
    }
}

/// Calculate the next step's population from its predecessor's.
///
/// `index` is the step's position in the enabled-step sequence (0-based).
/// The result is always in `[0, previous]`.
pub fn next_value(previous: u64, step: &FunnelStep, index: usize, rng: &mut impl Rng) -> u64 {
    if previous == 0 {
        return 0;
    }

    let (min, base_max) = if step.is_required {
        classify_step_type(&step.trigger_text()).base_range()
    } else {
        OPTIONAL_RANGE
    };

    // Later steps convert worse: shrink the achievable maximum per
    // position, floored at the bucket minimum.
    let max = (base_max - DECAY_PER_POSITION * index as f64).max(min);

    let rate = rng.gen_range(min..=max) / 100.0;
    let value = (previous as f64 * rate).round() as u64;
    value.min(previous)
}
