//! Immutable schema graph snapshot.
//!
//! Nodes are every indexed type and property. For each object property `p`
//! with domain D and range R there is an edge d→p for each d ∈ D and p→r for
//! each r ∈ R; data properties only get the domain side (their range names a
//! literal datatype, not a node). The same edges also follow from each
//! type's props/refs sets; that derivation is a consequence of the mirror
//! invariant, and edges are computed exactly once, from the domain/range
//! facts.
//!
//! A snapshot is rebuilt in full on every recalculation and handed read-only
//! to all enumeration workers; it is never patched in place.

use ahash::AHashMap;

use lodestar_index::{IndexError, VocabIndex};
use lodestar_schema::PropertyKind;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Type,
    Property { object: bool },
}

#[derive(Debug, Default)]
pub struct SchemaGraph {
    names: Vec<String>,
    kinds: Vec<NodeKind>,
    ids: AHashMap<String, NodeId>,
    preds: Vec<Vec<NodeId>>,
    succs: Vec<Vec<NodeId>>,
}

impl SchemaGraph {
    /// Builds a snapshot from the current index state.
    pub fn build(index: &VocabIndex) -> Result<Self, IndexError> {
        let types = index.get_types(None)?;
        let properties = index.get_properties(None)?;

        let mut graph = SchemaGraph::default();
        for t in &types {
            graph.insert(t, NodeKind::Type);
        }

        let mut entries = Vec::with_capacity(properties.len());
        for p in &properties {
            let entry = index.get_property(p)?;
            let object = entry.kind == PropertyKind::Object;
            graph.insert(p, NodeKind::Property { object });
            entries.push((p.clone(), entry, object));
        }

        for (p, entry, object) in entries {
            let pid = graph.ids[&p];
            for d in &entry.domain {
                // A domain naming no indexed type contributes no edge.
                if let Some(&did) = graph.ids.get(d) {
                    graph.add_edge(did, pid);
                }
            }
            if object {
                for r in &entry.range {
                    if let Some(&rid) = graph.ids.get(r) {
                        graph.add_edge(pid, rid);
                    }
                }
            }
        }

        for adj in graph.preds.iter_mut().chain(graph.succs.iter_mut()) {
            adj.sort_unstable();
            adj.dedup();
        }
        Ok(graph)
    }

    fn insert(&mut self, name: &str, kind: NodeKind) -> NodeId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.kinds.push(kind);
        self.preds.push(Vec::new());
        self.succs.push(Vec::new());
        self.ids.insert(name.to_string(), id);
        id
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.succs[from].push(to);
        self.preds[to].push(from);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.names[id]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.kinds[id]
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    pub fn preds(&self, id: NodeId) -> &[NodeId] {
        &self.preds[id]
    }

    pub fn succs(&self, id: NodeId) -> &[NodeId] {
        &self.succs[id]
    }
}
