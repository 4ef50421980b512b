//! Query-time path resolution.
//!
//! Combines the persisted walk/cycle catalogue with the current seed
//! registry. Nothing here recomputes anything: a vocabulary mutation rebuilt
//! the catalogue already, and seed mutations only change which walk prefixes
//! become concrete candidates.

use std::collections::BTreeSet;

use serde::Serialize;

use lodestar_index::{IndexError, IndexStore, SeedRegistry, VocabIndex};

use crate::engine::decode_steps;
use crate::Step;

/// A concrete, seed-grounded, cycle-folded path. Produced per query, never
/// persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Candidate {
    pub seeds: BTreeSet<String>,
    pub steps: Vec<Step>,
    pub cycles: BTreeSet<usize>,
}

/// A cycle referenced by at least one candidate, expanded to its steps.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CycleRef {
    pub cycle: usize,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Resolution {
    pub paths: Vec<Candidate>,
    pub cycles: Vec<CycleRef>,
}

/// Resolves every candidate path for `elm` against the current seeds.
///
/// Each Step of each persisted walk whose type has registered seeds marks a
/// legitimate start: the walk prefix up to it, reversed into forward order,
/// becomes a candidate. An element that is a type with its own seeds also
/// yields the zero-step candidate. Unknown elements resolve to an empty
/// result, not an error.
pub fn resolve(
    index: &VocabIndex,
    seeds: &SeedRegistry,
    elm: &str,
) -> Result<Resolution, IndexError> {
    let store: &std::sync::Arc<dyn IndexStore> = index.store();
    // Serializes against a concurrent rebuild, which holds this key's lock
    // for its whole swap window.
    let _guard = store.lock(&format!("paths:{elm}"));

    let walks: Vec<Vec<Step>> = store
        .ranked_members(&format!("paths:{elm}"))?
        .iter()
        .map(|raw| decode_steps(raw))
        .collect::<Result<_, _>>()?;
    let elm_cycles: BTreeSet<usize> = store
        .set_members(&format!("cycles:{elm}"))?
        .iter()
        .filter_map(|raw| raw.parse().ok())
        .collect();
    let catalogue: Vec<Vec<Step>> = store
        .ranked_members("cycles")?
        .iter()
        .map(|raw| decode_steps(raw))
        .collect::<Result<_, _>>()?;

    // Folding order: longest cycles first, ids break ties.
    let mut folding: Vec<(usize, &[Step])> = elm_cycles
        .iter()
        .filter_map(|&id| catalogue.get(id).map(|steps| (id, steps.as_slice())))
        .collect();
    folding.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

    let mut paths: Vec<Candidate> = Vec::new();
    let mut applying: BTreeSet<usize> = BTreeSet::new();

    let mut push_candidate = |steps: Vec<Step>, uris: BTreeSet<String>| {
        let candidate = Candidate {
            seeds: uris,
            steps,
            cycles: elm_cycles.clone(),
        };
        if !paths.contains(&candidate) {
            paths.push(candidate);
        }
        applying.extend(elm_cycles.iter().copied());
    };

    for walk in &walks {
        for (at, step) in walk.iter().enumerate() {
            let uris = seeds.seeds_of(&step.ty)?;
            if uris.is_empty() {
                continue;
            }
            // Walks are stored target-first; the prefix through this step,
            // reversed, is the forward route from the seed.
            let mut steps: Vec<Step> = walk[..=at].iter().rev().cloned().collect();
            fold_cycles(&mut steps, &folding);
            push_candidate(steps, uris);
        }
    }

    if index.is_type(elm)? {
        let direct = seeds.seeds_of(elm)?;
        if !direct.is_empty() {
            push_candidate(Vec::new(), direct);
        }
    }
    drop(push_candidate);

    let cycles = applying
        .into_iter()
        .filter_map(|id| {
            catalogue.get(id).map(|steps| CycleRef {
                cycle: id,
                steps: steps.clone(),
            })
        })
        .collect();

    Ok(Resolution { paths, cycles })
}

/// Removes one redundant lap per referenced cycle: the first contiguous run
/// matching the cycle's own Step sequence, aligned where the candidate first
/// holds the cycle's head Step. Backward unwinding linearizes cycles; the
/// lap stays represented by its id instead of being inlined.
fn fold_cycles(steps: &mut Vec<Step>, folding: &[(usize, &[Step])]) {
    for (_, cycle) in folding {
        if cycle.is_empty() {
            continue;
        }
        if let Some(start) = steps.iter().position(|s| s == &cycle[0]) {
            let end = start + cycle.len();
            if end <= steps.len() && steps[start..end] == cycle[..] {
                steps.drain(start..end);
            }
        }
    }
}
