//! Elementary circuit enumeration and the cycle catalogue.
//!
//! Johnson-style search: for each start vertex `s` in ascending order,
//! circuits whose least vertex is `s` are enumerated inside the strongly
//! connected component of `s` in the subgraph induced on vertices ≥ s, with
//! the usual blocked-set machinery. Every elementary circuit comes out
//! exactly once, in a deterministic order, which is what gives cycle IDs
//! their stability across identical rebuilds.

use ahash::{AHashMap, AHashSet};
use tracing::debug;

use crate::graph::{NodeId, NodeKind, SchemaGraph};
use crate::Step;

/// All elementary circuits of the graph, capped at `max_cycles`. Returns the
/// circuits as node sequences plus whether the cap truncated enumeration.
pub fn simple_circuits(graph: &SchemaGraph, max_cycles: usize) -> (Vec<Vec<NodeId>>, bool) {
    let mut search = CircuitSearch {
        graph,
        max_cycles,
        truncated: false,
        circuits: Vec::new(),
        blocked: AHashSet::new(),
        blocked_by: AHashMap::new(),
        stack: Vec::new(),
    };

    for s in 0..graph.len() {
        if search.truncated {
            break;
        }
        let component = scc_containing(graph, s);
        if component.len() < 2 {
            // Self-loops would be single-node circuits; the type/property
            // graph is bipartite so there are none.
            continue;
        }
        search.blocked.clear();
        search.blocked_by.clear();
        search.stack.clear();
        search.circuit(s, s, &component);
    }

    debug!(
        circuits = search.circuits.len(),
        truncated = search.truncated,
        "circuit enumeration finished"
    );
    (search.circuits, search.truncated)
}

struct CircuitSearch<'g> {
    graph: &'g SchemaGraph,
    max_cycles: usize,
    truncated: bool,
    circuits: Vec<Vec<NodeId>>,
    blocked: AHashSet<NodeId>,
    blocked_by: AHashMap<NodeId, Vec<NodeId>>,
    stack: Vec<NodeId>,
}

impl CircuitSearch<'_> {
    fn circuit(&mut self, v: NodeId, s: NodeId, component: &AHashSet<NodeId>) -> bool {
        let mut found = false;
        self.stack.push(v);
        self.blocked.insert(v);

        for &w in self.graph.succs(v) {
            if !component.contains(&w) {
                continue;
            }
            if self.circuits.len() >= self.max_cycles {
                self.truncated = true;
                break;
            }
            if w == s {
                self.circuits.push(self.stack.clone());
                found = true;
            } else if !self.blocked.contains(&w) && self.circuit(w, s, component) {
                found = true;
            }
        }

        if found {
            self.unblock(v);
        } else {
            for &w in self.graph.succs(v) {
                if component.contains(&w) {
                    let list = self.blocked_by.entry(w).or_default();
                    if !list.contains(&v) {
                        list.push(v);
                    }
                }
            }
        }
        self.stack.pop();
        found
    }

    fn unblock(&mut self, v: NodeId) {
        self.blocked.remove(&v);
        if let Some(waiting) = self.blocked_by.remove(&v) {
            for w in waiting {
                if self.blocked.contains(&w) {
                    self.unblock(w);
                }
            }
        }
    }
}

/// Strongly connected component of `s` within the subgraph induced on
/// vertices ≥ s: forward reachability intersected with backward
/// reachability.
fn scc_containing(graph: &SchemaGraph, s: NodeId) -> AHashSet<NodeId> {
    let forward = reachable(graph, s, true);
    let backward = reachable(graph, s, false);
    forward.intersection(&backward).copied().collect()
}

fn reachable(graph: &SchemaGraph, s: NodeId, forward: bool) -> AHashSet<NodeId> {
    let mut seen = AHashSet::new();
    seen.insert(s);
    let mut stack = vec![s];
    while let Some(v) = stack.pop() {
        let next = if forward {
            graph.succs(v)
        } else {
            graph.preds(v)
        };
        for &w in next {
            if w >= s && seen.insert(w) {
                stack.push(w);
            }
        }
    }
    seen
}

/// Normalizes a circuit's alternating type/property nodes into Steps by
/// pairing each property with the type the circuit enters it from; a
/// trailing type pairs with the circuit head.
pub fn normalize_circuit(graph: &SchemaGraph, circuit: &[NodeId]) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut pending: Option<NodeId> = None;
    for &node in circuit {
        match graph.kind(node) {
            NodeKind::Type => pending = Some(node),
            NodeKind::Property { .. } => {
                if let Some(t) = pending.take() {
                    steps.push(Step::new(graph.name(node), graph.name(t)));
                }
            }
        }
    }
    if let Some(t) = pending {
        // The circuit wraps: its head must be the property closing the lap.
        steps.push(Step::new(graph.name(circuit[0]), graph.name(t)));
    }
    steps
}

/// The enumerated catalogue: cycle `i`'s Step sequence plus the set of node
/// names participating in it, for tagging walks.
pub struct CycleCatalog {
    pub cycles: Vec<Vec<Step>>,
    members: Vec<AHashSet<String>>,
    pub truncated: bool,
}

impl CycleCatalog {
    pub fn enumerate(graph: &SchemaGraph, max_cycles: usize) -> Self {
        let (circuits, truncated) = simple_circuits(graph, max_cycles);
        let cycles: Vec<Vec<Step>> = circuits
            .iter()
            .map(|c| normalize_circuit(graph, c))
            .collect();
        let members = cycles
            .iter()
            .map(|steps| {
                let mut names = AHashSet::new();
                for step in steps {
                    names.insert(step.property.clone());
                    names.insert(step.ty.clone());
                }
                names
            })
            .collect();
        CycleCatalog {
            cycles,
            members,
            truncated,
        }
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// IDs of every cycle the step touches, by property or by type.
    pub fn touching<'a>(&'a self, step: &'a Step) -> impl Iterator<Item = usize> + 'a {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, names)| names.contains(&step.property) || names.contains(&step.ty))
            .map(|(id, _)| id)
    }
}
