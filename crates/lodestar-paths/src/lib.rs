//! Walk planning over indexed vocabularies.
//!
//! A crawl agent asks "how do I reach instances of this element, starting
//! from a seed I already have?". This crate answers by precomputing, for
//! every indexed type and property, the backward walks leading to it:
//!
//! 1. [`graph`] rebuilds one directed graph over all indexed types and
//!    properties (domain edges into a property, range edges out of it).
//! 2. [`cycles`] enumerates the graph's elementary circuits into a stable
//!    catalogue, because schema graphs are routinely cyclic.
//! 3. [`walks`] unwinds predecessor edges from every node, stopping each
//!    branch after its first full lap around a cycle.
//! 4. [`engine`] runs steps 1 to 3 as one atomic generation swap in the
//!    index store.
//! 5. [`resolve`] combines persisted walks with the current seed registry at
//!    query time, folding redundant cycle laps out of the concrete paths.
//!
//! [`planner::Planner`] is the facade that ties the schema catalog, the
//! vocabulary index, the seed registry and this engine together.

pub mod cycles;
pub mod engine;
pub mod graph;
pub mod planner;
pub mod resolve;
pub mod walks;

use serde::{Deserialize, Serialize};

pub use engine::RecalcSummary;
pub use planner::Planner;
pub use resolve::{Candidate, CycleRef, Resolution};

/// One hop of a walk: standing at an instance of `ty`, traverse `property`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Step {
    pub property: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Step {
    pub fn new(property: impl Into<String>, ty: impl Into<String>) -> Self {
        Step {
            property: property.into(),
            ty: ty.into(),
        }
    }
}

/// Tuning knobs for recalculation.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Bounded worker pool size shared by extraction and enumeration
    /// fan-outs. Independent of graph size.
    pub workers: usize,
    /// Hard cap on enumerated elementary circuits. Circuit enumeration is
    /// worst-case exponential in the schema graph's cyclomatic complexity;
    /// hitting the cap truncates the catalogue and logs a warning. A scaling
    /// safety valve, not a correctness concern.
    pub max_cycles: usize,
    /// Backward-walk recursion bound for pathological schemas. The normal
    /// stop condition is the walk's own root; this bound only cuts runaway
    /// branches that keep finding fresh steps.
    pub max_depth: usize,
}

impl Default for PathConfig {
    fn default() -> Self {
        PathConfig {
            workers: 8,
            max_cycles: 4096,
            max_depth: 64,
        }
    }
}
