//! Backward walk enumeration.
//!
//! A walk to a node is built by unwinding predecessor edges from it. Two
//! rules keep cyclic schemas finite, both inherited from the crawl planner's
//! documented behavior and preserved exactly:
//!
//! - a branch never re-enters the walk's own root once it has taken at least
//!   one step (the "first full lap" stop), and
//! - a branch skips any Step it already contains.
//!
//! A type revisited as a non-root intermediate is deliberately *not* pruned
//! earlier than a full lap; `max_depth` exists only to cut pathological
//! branches that keep producing fresh steps.

use ahash::AHashSet;

use lodestar_index::{IndexError, VocabIndex};

use crate::graph::{NodeId, NodeKind, SchemaGraph};
use crate::{PathConfig, Step};

/// All walks for one node, in discovery order.
///
/// Type nodes unwind from each predecessor property, and additionally union
/// in the walks of every subtype (a seed of a subtype satisfies a request
/// for the supertype). Property nodes unwind from themselves as their own
/// root.
pub fn node_walks(
    graph: &SchemaGraph,
    index: &VocabIndex,
    node: NodeId,
    config: &PathConfig,
) -> Result<Vec<Vec<Step>>, IndexError> {
    match graph.kind(node) {
        NodeKind::Type => {
            let mut walks = Vec::new();
            for &p in graph.preds(node) {
                walks.extend(backward_walks(graph, p, node, config));
            }
            let entry = index.get_type(graph.name(node))?;
            for sub in &entry.sub_types {
                if let Some(sub_id) = graph.id_of(sub) {
                    for &p in graph.preds(sub_id) {
                        walks.extend(backward_walks(graph, p, sub_id, config));
                    }
                }
            }
            Ok(walks)
        }
        NodeKind::Property { .. } => Ok(backward_walks(graph, node, node, config)),
    }
}

fn backward_walks(
    graph: &SchemaGraph,
    property: NodeId,
    root: NodeId,
    config: &PathConfig,
) -> Vec<Vec<Step>> {
    let seen = AHashSet::new();
    recurse(graph, property, root, &seen, config.max_depth)
}

/// One recursion level: `property` is the node being entered backwards,
/// `seen` the Steps already on this branch.
fn recurse(
    graph: &SchemaGraph,
    property: NodeId,
    root: NodeId,
    seen: &AHashSet<(NodeId, NodeId)>,
    depth: usize,
) -> Vec<Vec<Step>> {
    let mut walks = Vec::new();
    if depth == 0 {
        return walks;
    }
    for &t in graph.preds(property) {
        // The root type is a valid start only for the very first step;
        // reaching it later means the branch closed a full lap.
        if t == root && !seen.is_empty() {
            continue;
        }
        let hop = (property, t);
        if seen.contains(&hop) {
            continue;
        }
        let step = Step::new(graph.name(property), graph.name(t));
        let mut branch = seen.clone();
        branch.insert(hop);
        for &pred in graph.preds(t) {
            for mut tail in recurse(graph, pred, root, &branch, depth - 1) {
                let mut walk = Vec::with_capacity(tail.len() + 1);
                walk.push(step.clone());
                walk.append(&mut tail);
                walks.push(walk);
            }
        }
        // A dead-ended branch still contributes its own single step.
        if walks.is_empty() {
            walks.push(vec![step]);
        }
    }
    walks
}
