//! Three types chained into a directed cycle through non-inverse properties,
//! resolved under partial and full seeding.

use std::collections::BTreeSet;
use std::sync::Arc;

use lodestar_index::{IndexStore, MemoryStore};
use lodestar_paths::{PathConfig, Planner};
use lodestar_schema::{PropertyDecl, TypeDecl, VocabularyFacts};

const SEED1: &str = "http://localhost/seed";
const SEED2: &str = "http://localhost/seed2";
const SEED3: &str = "http://localhost/seed3";

fn three_type_cycle_vocab() -> VocabularyFacts {
    VocabularyFacts::new("test")
        .with_type(TypeDecl::new("test:Concept1"))
        .with_type(TypeDecl::new("test:Concept2"))
        .with_type(TypeDecl::new("test:Concept3"))
        .with_property(
            PropertyDecl::object("test:prop12")
                .domain("test:Concept1")
                .range("test:Concept2"),
        )
        .with_property(
            PropertyDecl::object("test:prop23")
                .domain("test:Concept2")
                .range("test:Concept3"),
        )
        .with_property(
            PropertyDecl::object("test:prop31")
                .domain("test:Concept3")
                .range("test:Concept1"),
        )
}

fn planner() -> Planner {
    let store: Arc<dyn IndexStore> = Arc::new(MemoryStore::new());
    let planner = Planner::new(store, PathConfig::default()).unwrap();
    planner.add_vocabulary(three_type_cycle_vocab()).unwrap();
    planner
}

#[test]
fn graph_facts_follow_the_chain() {
    let planner = planner();

    let c2 = planner.get_type("test:Concept2").unwrap();
    assert_eq!(c2.properties, BTreeSet::from(["test:prop23".to_string()]));
    assert_eq!(c2.refs, BTreeSet::from(["test:prop12".to_string()]));

    let p31 = planner.get_property("test:prop31").unwrap();
    assert_eq!(p31.domain, BTreeSet::from(["test:Concept3".to_string()]));
    assert_eq!(p31.range, BTreeSet::from(["test:Concept1".to_string()]));
    assert!(p31.inverse.is_empty());
}

#[test]
fn self_seed_resolves_to_the_zero_step_candidate() {
    let planner = planner();
    planner.add_seed("test:Concept1", SEED1).unwrap();

    let resolution = planner.resolve("test:Concept1").unwrap();
    assert_eq!(resolution.paths.len(), 1);
    let candidate = &resolution.paths[0];
    assert!(candidate.steps.is_empty());
    assert_eq!(candidate.seeds, BTreeSet::from([SEED1.to_string()]));
    assert_eq!(candidate.cycles, BTreeSet::from([0]));

    assert_eq!(resolution.cycles.len(), 1);
    assert_eq!(resolution.cycles[0].cycle, 0);
    assert_eq!(resolution.cycles[0].steps.len(), 3);
}

#[test]
fn distance_one_and_two_resolve_through_the_cycle() {
    let planner = planner();
    planner.add_seed("test:Concept1", SEED1).unwrap();

    let r2 = planner.resolve("test:Concept2").unwrap();
    assert_eq!(r2.paths.len(), 1);
    assert_eq!(r2.paths[0].steps.len(), 1, "Concept2 is one hop from the seed");

    let r3 = planner.resolve("test:Concept3").unwrap();
    assert_eq!(r3.paths.len(), 1);
    assert_eq!(r3.paths[0].steps.len(), 2, "Concept3 is two hops from the seed");
    assert_eq!(r3.paths[0].cycles, BTreeSet::from([0]));
}

#[test]
fn partial_seeding_yields_one_candidate_per_seeded_start() {
    let planner = planner();
    planner.add_seed("test:Concept1", SEED1).unwrap();
    planner.add_seed("test:Concept2", SEED2).unwrap();

    let resolution = planner.resolve("test:Concept3").unwrap();
    assert_eq!(resolution.paths.len(), 2, "two candidates expected");

    for candidate in &resolution.paths {
        assert_eq!(candidate.seeds.len(), 1);
        let seed = candidate.seeds.iter().next().unwrap();
        match candidate.steps.len() {
            2 => assert_eq!(seed, SEED1, "the two-hop route starts at Concept1"),
            1 => assert_eq!(seed, SEED2, "the one-hop route starts at Concept2"),
            n => panic!("unexpected candidate with {n} steps"),
        }
        assert_eq!(candidate.cycles, BTreeSet::from([0]));
    }
}

#[test]
fn full_seeding_adds_the_direct_candidate() {
    let planner = planner();
    planner.add_seed("test:Concept1", SEED1).unwrap();
    planner.add_seed("test:Concept2", SEED2).unwrap();
    planner.add_seed("test:Concept3", SEED3).unwrap();

    let resolution = planner.resolve("test:Concept3").unwrap();
    assert_eq!(resolution.paths.len(), 3, "three candidates expected");

    for candidate in &resolution.paths {
        let seed = candidate.seeds.iter().next().unwrap();
        match candidate.steps.len() {
            2 => assert_eq!(seed, SEED1),
            1 => assert_eq!(seed, SEED2),
            0 => assert_eq!(seed, SEED3),
            n => panic!("unexpected candidate with {n} steps"),
        }
    }
}

#[test]
fn resolution_is_deterministic() {
    let planner = planner();
    planner.add_seed("test:Concept1", SEED1).unwrap();
    planner.add_seed("test:Concept2", SEED2).unwrap();

    let first = planner.resolve("test:Concept3").unwrap();
    let second = planner.resolve("test:Concept3").unwrap();
    assert_eq!(first, second);
}
