//! Split-variation allocation
//!
//! Partitions a step's population across its split variations. Random
//! weights give each variation a proportion; all but the last variation
//! round their share, and the last receives whatever remains, so rounding
//! error is concentrated in one place instead of silently drifting.

use rand::Rng;

/// Allocate `total` across `count` variations.
///
/// The returned counts always sum to exactly `total` and every entry is
/// non-negative. `count == 0` returns an empty vector; `total == 0`
/// returns all zeros.
pub fn allocate(total: u64, count: usize, rng: &mut impl Rng) -> Vec<u64> {
    if count == 0 {
        return Vec::new();
    }
    if total == 0 {
        return vec![0; count];
    }

    let weights: Vec<f64> = (0..count).map(|_| rng.gen::<f64>()).collect();
    let weight_sum: f64 = weights.iter().sum();

    let mut allocated = Vec::with_capacity(count);
    let mut remaining = total;

    for (i, weight) in weights.iter().enumerate() {
        let value = if i == count - 1 {
            // Last variation absorbs the rounding remainder.
            remaining
        } else {
            let proportion = if weight_sum > 0.0 {
                weight / weight_sum
            } else {
                1.0 / count as f64
            };
            // Capped at the remaining budget so adversarial rounding can
            // never push the total past `total`.
            ((proportion * total as f64).round() as u64).min(remaining)
        };
        remaining -= value;
        allocated.push(value);
    }

    allocated
}
