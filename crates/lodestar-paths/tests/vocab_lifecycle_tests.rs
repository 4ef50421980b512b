//! Vocabulary add/update/delete against the full planning stack:
//! cross-vocabulary re-extraction, deletion scrubbing and the seed cascade.

use std::collections::BTreeSet;
use std::sync::Arc;

use lodestar_index::{IndexError, IndexStore, MemoryStore};
use lodestar_paths::{PathConfig, Planner};
use lodestar_schema::{PropertyDecl, TypeDecl, VocabularyFacts};

fn planner() -> Planner {
    let store: Arc<dyn IndexStore> = Arc::new(MemoryStore::new());
    Planner::new(store, PathConfig::default()).unwrap()
}

fn base_vocab() -> VocabularyFacts {
    VocabularyFacts::new("base")
        .with_type(TypeDecl::new("base:Agent"))
        .with_property(
            PropertyDecl::object("base:knows")
                .domain("base:Agent")
                .range("base:Agent"),
        )
}

/// A second vocabulary subclassing a foreign type.
fn ext_vocab() -> VocabularyFacts {
    VocabularyFacts::new("ext")
        .with_type(TypeDecl::new("ext:Robot").subclass_of("base:Agent"))
        .with_property(
            PropertyDecl::object("ext:operates")
                .domain("base:Agent")
                .range("ext:Robot"),
        )
}

#[test]
fn duplicate_vocabulary_conflicts() {
    let planner = planner();
    planner.add_vocabulary(base_vocab()).unwrap();
    assert!(matches!(
        planner.add_vocabulary(base_vocab()),
        Err(IndexError::Conflict(_))
    ));
}

#[test]
fn update_with_mismatched_identifier_is_a_validation_error() {
    let planner = planner();
    planner.add_vocabulary(base_vocab()).unwrap();
    assert!(matches!(
        planner.update_vocabulary("base", VocabularyFacts::new("other")),
        Err(IndexError::Validation(_))
    ));
    assert!(matches!(
        planner.update_vocabulary("ghost", VocabularyFacts::new("ghost")),
        Err(IndexError::NotFound(_))
    ));
}

#[test]
fn foreign_entries_pick_up_cross_vocabulary_links() {
    let planner = planner();
    planner.add_vocabulary(base_vocab()).unwrap();
    planner.add_vocabulary(ext_vocab()).unwrap();

    // base:Agent was re-extracted when ext arrived: it now sees its foreign
    // subtype and the foreign property it inherits nothing from.
    let agent = planner.get_type("base:Agent").unwrap();
    assert!(agent.sub_types.contains("ext:Robot"));
    assert!(agent.properties.contains("ext:operates"));

    // The subtype inherits the foreign property and is a valid knows-range.
    let robot = planner.get_type("ext:Robot").unwrap();
    assert!(robot.properties.contains("base:knows"));
    assert!(robot.refs.contains("base:knows"));

    // Subtype expansion reaches the property domain as well.
    let knows = planner.get_property("base:knows").unwrap();
    assert!(knows.domain.contains("ext:Robot"));
}

#[test]
fn deleting_a_vocabulary_scrubs_foreign_references() {
    let planner = planner();
    planner.add_vocabulary(base_vocab()).unwrap();
    planner.add_vocabulary(ext_vocab()).unwrap();
    planner.delete_vocabulary("ext").unwrap();

    let agent = planner.get_type("base:Agent").unwrap();
    assert!(!agent.sub_types.contains("ext:Robot"));
    assert!(agent.properties.contains("base:knows"));

    assert!(matches!(
        planner.get_type("ext:Robot"),
        Err(IndexError::NotFound(_))
    ));
    assert!(matches!(
        planner.get_property("ext:operates"),
        Err(IndexError::NotFound(_))
    ));
    assert!(matches!(
        planner.delete_vocabulary("ext"),
        Err(IndexError::NotFound(_))
    ));
}

#[test]
fn deletion_cascades_seeds_of_vanished_types() {
    let planner = planner();
    planner.add_vocabulary(base_vocab()).unwrap();
    planner.add_vocabulary(ext_vocab()).unwrap();

    planner.add_seed("ext:Robot", "http://example.org/r2d2").unwrap();
    let kept = planner.add_seed("base:Agent", "http://example.org/ada").unwrap();

    planner.delete_vocabulary("ext").unwrap();

    // The foreign type's seeds went with it; the surviving type keeps its.
    assert!(planner.seeds().unwrap().iter().all(|s| s.ty != "ext:Robot"));
    assert_eq!(planner.get_seed(&kept).unwrap().ty, "base:Agent");
}

#[test]
fn update_replaces_facts_wholesale() {
    let planner = planner();
    planner.add_vocabulary(base_vocab()).unwrap();

    planner
        .update_vocabulary(
            "base",
            VocabularyFacts::new("base")
                .with_type(TypeDecl::new("base:Agent"))
                .with_type(TypeDecl::new("base:Place"))
                .with_property(
                    PropertyDecl::object("base:visits")
                        .domain("base:Agent")
                        .range("base:Place"),
                ),
        )
        .unwrap();

    assert_eq!(
        planner.properties().unwrap(),
        BTreeSet::from(["base:visits".to_string()])
    );
    let agent = planner.get_type("base:Agent").unwrap();
    assert_eq!(agent.properties, BTreeSet::from(["base:visits".to_string()]));
    assert!(agent.refs.is_empty());
}

#[test]
fn extraction_is_idempotent() {
    let planner = planner();
    planner.add_vocabulary(base_vocab()).unwrap();
    let before = planner.get_type("base:Agent").unwrap();

    // Re-running analysis over identical content changes nothing.
    planner.analyse("base").unwrap();
    assert_eq!(planner.get_type("base:Agent").unwrap(), before);
}

#[test]
fn mirror_invariant_holds_after_extraction() {
    let planner = planner();
    planner.add_vocabulary(base_vocab()).unwrap();
    planner.add_vocabulary(ext_vocab()).unwrap();

    for ty in planner.types().unwrap() {
        let entry = planner.get_type(&ty).unwrap();
        for prop in planner.properties().unwrap() {
            let in_domain = planner.get_property(&prop).unwrap().domain.contains(&ty);
            assert_eq!(
                entry.properties.contains(&prop),
                in_domain,
                "mirror violated for {ty} / {prop}"
            );
        }
    }
}
