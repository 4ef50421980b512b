//! Full recalculation: graph snapshot → cycle catalogue → parallel walk
//! enumeration → one atomic generation swap.
//!
//! Persisted layout:
//!
//! ```text
//! cycles          ranked list, rank = cycle id, member = JSON Step sequence
//! cycles:{node}   set of cycle ids whose cycles any of the node's walks touch
//! paths:{node}    ranked list, rank = discovery order, member = JSON walk
//! ```
//!
//! The engine holds the per-key locks of every previously persisted path key
//! for the whole window and replaces the old generation with the new one in
//! a single atomic batch, so a resolver sees either the complete prior index
//! or the complete new one. A failure anywhere before the batch leaves the
//! prior generation untouched and authoritative.

use std::collections::BTreeSet;
use std::time::Instant;

use rayon::prelude::*;
use serde_json as json;
use tracing::{debug, info, warn};

use lodestar_index::{IndexError, IndexStore, VocabIndex, WriteBatch};

use crate::cycles::CycleCatalog;
use crate::graph::SchemaGraph;
use crate::walks::node_walks;
use crate::{PathConfig, Step};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecalcSummary {
    pub nodes: usize,
    pub walks: usize,
    pub cycles: usize,
    /// True when `max_cycles` truncated circuit enumeration.
    pub truncated: bool,
}

pub fn recalculate(
    index: &VocabIndex,
    pool: &rayon::ThreadPool,
    config: &PathConfig,
) -> Result<RecalcSummary, IndexError> {
    info!("recalculating walk and cycle catalogue");
    let started = Instant::now();
    let store: &std::sync::Arc<dyn IndexStore> = index.store();

    let graph = SchemaGraph::build(index)?;
    let catalog = CycleCatalog::enumerate(&graph, config.max_cycles);
    if catalog.truncated {
        warn!(
            max_cycles = config.max_cycles,
            "cycle enumeration truncated; walk tags for the missing cycles are dropped"
        );
    }

    // Exclusive hold over the prior generation for the whole window.
    let prior_keys = store.keys("paths:*")?;
    let _guards: Vec<_> = prior_keys.iter().map(|k| store.lock(k)).collect();

    let per_node = pool.install(|| {
        (0..graph.len())
            .into_par_iter()
            .map(|node| {
                let walks = node_walks(&graph, index, node, config)?;
                debug!("{} walks for {}", walks.len(), graph.name(node));
                Ok((graph.name(node).to_string(), walks))
            })
            .collect::<Result<Vec<_>, IndexError>>()
    })?;

    let mut batch = WriteBatch::new();
    for key in store.keys("paths:*")? {
        batch.delete(key);
    }
    for key in store.keys("cycles*")? {
        batch.delete(key);
    }
    for steps in &catalog.cycles {
        batch.ranked_push("cycles", [encode_steps(steps)?]);
    }

    let mut total_walks = 0usize;
    for (name, walks) in &per_node {
        if walks.is_empty() {
            continue;
        }
        let mut touched: BTreeSet<usize> = BTreeSet::new();
        for walk in walks {
            for step in walk {
                touched.extend(catalog.touching(step));
            }
        }
        let encoded: Vec<String> = walks
            .iter()
            .map(|w| encode_steps(w))
            .collect::<Result<_, _>>()?;
        batch.ranked_push(format!("paths:{name}"), encoded);
        batch.set_add(
            format!("cycles:{name}"),
            touched.iter().map(|id| id.to_string()),
        );
        total_walks += walks.len();
    }

    store.apply(batch)?;

    let summary = RecalcSummary {
        nodes: graph.len(),
        walks: total_walks,
        cycles: catalog.len(),
        truncated: catalog.truncated,
    };
    info!(
        nodes = summary.nodes,
        walks = summary.walks,
        cycles = summary.cycles,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "recalculation done"
    );
    Ok(summary)
}

pub(crate) fn encode_steps(steps: &[Step]) -> Result<String, IndexError> {
    json::to_string(steps).map_err(|e| IndexError::Validation(e.to_string()))
}

pub(crate) fn decode_steps(raw: &str) -> Result<Vec<Step>, IndexError> {
    json::from_str(raw).map_err(|e| IndexError::Validation(e.to_string()))
}
