//! Flow-graph construction
//!
//! Assembles the directed graph the rendering layer consumes: an entry
//! node, one node per enabled step, one node per split variation, and an
//! exit node, connected by population-weighted links. Links with no flow
//! are dropped; nodes never are, since an empty step is still part of the
//! shape of the funnel. Every link endpoint must resolve to a node, and
//! building fails loudly if one does not.

use std::collections::HashSet;

use funnelgraph_types::{FlowGraph, FunnelError, FunnelResult, GraphLink, GraphNode};

use super::{ComputedSplit, ComputedStep};

/// Reserved id of the entry node
pub const ENTRY_NODE_ID: &str = "entry";
/// Reserved id of the exit node
pub const EXIT_NODE_ID: &str = "exit";

/// Apportion `total` across `shares`, proportionally to each share.
///
/// Uses the same reconciliation discipline as the split allocator: all but
/// the last entry round, the last absorbs the remainder, and no entry can
/// push the running sum past `total`.
fn apportion(total: u64, shares: &[u64]) -> Vec<u64> {
    let count = shares.len();
    if count == 0 {
        return Vec::new();
    }
    let share_sum: u64 = shares.iter().sum();
    if share_sum == 0 {
        return vec![0; count];
    }

    let mut out = Vec::with_capacity(count);
    let mut remaining = total;
    for (i, share) in shares.iter().enumerate() {
        let value = if i == count - 1 {
            remaining
        } else {
            let exact = total as f64 * (*share as f64 / share_sum as f64);
            (exact.round() as u64).min(remaining)
        };
        remaining -= value;
        out.push(value);
    }
    out
}

/// Build the flow graph from the computed step and split populations
pub fn build(
    steps: &[ComputedStep<'_>],
    splits: &[ComputedSplit<'_>],
    initial_population: u64,
) -> FunnelResult<FlowGraph> {
    let mut nodes = Vec::new();
    let mut links = Vec::new();

    nodes.push(GraphNode {
        id: ENTRY_NODE_ID.to_string(),
        name: "Entry".to_string(),
        value: initial_population,
        is_optional: None,
        is_split: None,
        parent_id: None,
    });

    for computed in steps {
        nodes.push(GraphNode {
            id: computed.step.id.clone(),
            name: computed.step.name.clone(),
            value: computed.value,
            is_optional: (!computed.step.is_required).then_some(true),
            is_split: None,
            parent_id: None,
        });
    }

    for split in splits {
        nodes.push(GraphNode {
            id: split.variation.id.clone(),
            name: split.variation.name.clone(),
            value: split.value,
            is_optional: None,
            is_split: Some(true),
            parent_id: Some(split.parent_step_id.to_string()),
        });
    }

    let exit_value = steps.last().map(|s| s.value).unwrap_or(initial_population);
    nodes.push(GraphNode {
        id: EXIT_NODE_ID.to_string(),
        name: "Exit".to_string(),
        value: exit_value,
        is_optional: None,
        is_split: None,
        parent_id: None,
    });

    if let Some(first) = steps.first() {
        links.push(GraphLink {
            source: ENTRY_NODE_ID.to_string(),
            target: first.step.id.clone(),
            value: first.value,
        });
    } else {
        links.push(GraphLink {
            source: ENTRY_NODE_ID.to_string(),
            target: EXIT_NODE_ID.to_string(),
            value: initial_population,
        });
    }

    for (i, computed) in steps.iter().enumerate() {
        let step_splits: Vec<&ComputedSplit<'_>> = splits
            .iter()
            .filter(|s| s.parent_step_id == computed.step.id)
            .collect();

        let (next_id, next_value) = match steps.get(i + 1) {
            Some(next) => (next.step.id.as_str(), next.value),
            None => (EXIT_NODE_ID, computed.value),
        };

        if step_splits.is_empty() {
            links.push(GraphLink {
                source: computed.step.id.clone(),
                target: next_id.to_string(),
                value: next_value,
            });
        } else {
            // Branch into the splits, then carry each split's share of the
            // next step's population onward.
            for split in &step_splits {
                links.push(GraphLink {
                    source: computed.step.id.clone(),
                    target: split.variation.id.clone(),
                    value: split.value,
                });
            }

            let shares: Vec<u64> = step_splits.iter().map(|s| s.value).collect();
            let onward = apportion(next_value, &shares);
            for (split, value) in step_splits.iter().zip(onward) {
                links.push(GraphLink {
                    source: split.variation.id.clone(),
                    target: next_id.to_string(),
                    value,
                });
            }
        }
    }

    // Zero-flow links carry no information for the renderer.
    links.retain(|link| link.value > 0);

    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    for link in &links {
        if !node_ids.contains(link.source.as_str()) || !node_ids.contains(link.target.as_str()) {
            return Err(FunnelError::ReferentialIntegrity {
                link_source: link.source.clone(),
                link_target: link.target.clone(),
            });
        }
    }

    Ok(FlowGraph { nodes, links })
}
