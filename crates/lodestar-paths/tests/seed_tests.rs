//! Seed registration, lookup and deletion against a live planner.

use std::collections::BTreeSet;
use std::sync::Arc;

use lodestar_index::{IndexError, IndexStore, MemoryStore};
use lodestar_paths::{PathConfig, Planner};
use lodestar_schema::{PropertyDecl, TypeDecl, VocabularyFacts};

const SEED: &str = "http://localhost/seed";

fn planner() -> Planner {
    let store: Arc<dyn IndexStore> = Arc::new(MemoryStore::new());
    let planner = Planner::new(store, PathConfig::default()).unwrap();
    planner
        .add_vocabulary(
            VocabularyFacts::new("test")
                .with_type(TypeDecl::new("test:Concept1"))
                .with_property(PropertyDecl::data("test:label").domain("test:Concept1")),
        )
        .unwrap();
    planner
}

#[test]
fn seed_for_an_undeclared_type_is_rejected() {
    let planner = planner();

    let err = planner.add_seed("test:Ghost", SEED).unwrap_err();
    assert!(matches!(err, IndexError::NotFound(_)));

    // Nothing was persisted for the bogus type.
    assert!(planner.seeds().unwrap().is_empty());
}

#[test]
fn malformed_uris_are_rejected() {
    let planner = planner();
    let err = planner.add_seed("test:Concept1", "not a uri").unwrap_err();
    assert!(matches!(err, IndexError::Validation(_)));
}

#[test]
fn duplicate_registration_conflicts_and_keeps_the_first() {
    let planner = planner();
    let id = planner.add_seed("test:Concept1", SEED).unwrap();

    let err = planner.add_seed("test:Concept1", SEED).unwrap_err();
    assert!(matches!(err, IndexError::Conflict(_)));

    // The first registration is unaffected.
    let seed = planner.get_seed(&id).unwrap();
    assert_eq!(seed.uri, SEED);
    assert_eq!(seed.ty, "test:Concept1");
    assert_eq!(
        planner.type_seeds("test:Concept1").unwrap(),
        BTreeSet::from([SEED.to_string()])
    );
}

#[test]
fn a_uri_may_seed_several_types() {
    let planner = planner();
    planner
        .update_vocabulary(
            "test",
            VocabularyFacts::new("test")
                .with_type(TypeDecl::new("test:Concept1"))
                .with_type(TypeDecl::new("test:Concept2"))
                .with_property(PropertyDecl::data("test:label").domain("test:Concept1")),
        )
        .unwrap();

    let id1 = planner.add_seed("test:Concept1", SEED).unwrap();
    let id2 = planner.add_seed("test:Concept2", SEED).unwrap();
    assert_ne!(id1, id2, "seed ids derive from the (type, uri) pair");
    assert_eq!(planner.seeds().unwrap().len(), 2);
}

#[test]
fn seed_crud_round_trip() {
    let planner = planner();
    let id = planner.add_seed("test:Concept1", SEED).unwrap();

    planner.delete_seed(&id).unwrap();
    assert!(planner.type_seeds("test:Concept1").unwrap().is_empty());

    // A deleted or never-issued id is invalid.
    assert!(matches!(
        planner.get_seed(&id),
        Err(IndexError::InvalidSeed(_))
    ));
    assert!(matches!(
        planner.delete_seed("deadbeef"),
        Err(IndexError::InvalidSeed(_))
    ));
}

#[test]
fn type_seed_queries_require_a_declared_type() {
    let planner = planner();
    assert!(matches!(
        planner.type_seeds("test:Ghost"),
        Err(IndexError::NotFound(_))
    ));
    // Declared but unseeded types answer with an empty set.
    assert!(planner.type_seeds("test:Concept1").unwrap().is_empty());
}
