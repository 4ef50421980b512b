//! Property tests over randomly generated schemas: recalculation and
//! resolution are deterministic, and the extracted facts keep the
//! domain/properties mirror intact.

use std::sync::Arc;

use proptest::prelude::*;

use lodestar_index::{IndexStore, MemoryStore};
use lodestar_paths::{PathConfig, Planner, Resolution};
use lodestar_schema::{PropertyDecl, TypeDecl, VocabularyFacts};

const MAX_TYPES: usize = 5;
const MAX_PROPS: usize = 6;
const MAX_SUBCLASS_EDGES: usize = 3;

#[derive(Debug, Clone)]
struct SchemaCase {
    type_count: usize,
    /// (domain type idx, range type idx, object?) per property.
    props: Vec<(usize, usize, bool)>,
    /// (sub type idx, super type idx) pairs.
    subclasses: Vec<(usize, usize)>,
    seeded: usize,
}

fn schema_case_strategy() -> impl Strategy<Value = SchemaCase> {
    (2usize..=MAX_TYPES).prop_flat_map(|type_count| {
        (
            Just(type_count),
            prop::collection::vec(
                (0..type_count, 0..type_count, prop::bool::ANY),
                1..=MAX_PROPS,
            ),
            prop::collection::vec((0..type_count, 0..type_count), 0..=MAX_SUBCLASS_EDGES),
            0..type_count,
        )
            .prop_map(|(type_count, props, subclasses, seeded)| SchemaCase {
                type_count,
                props,
                subclasses,
                seeded,
            })
    })
}

fn type_name(i: usize) -> String {
    format!("gen:Type{i}")
}

fn build_vocab(case: &SchemaCase) -> VocabularyFacts {
    let mut facts = VocabularyFacts::new("gen");
    for i in 0..case.type_count {
        let mut decl = TypeDecl::new(type_name(i));
        for (sub, sup) in &case.subclasses {
            if *sub == i && sub != sup {
                decl = decl.subclass_of(type_name(*sup));
            }
        }
        facts = facts.with_type(decl);
    }
    for (i, (d, r, object)) in case.props.iter().enumerate() {
        let decl = if *object {
            PropertyDecl::object(format!("gen:prop{i}"))
                .domain(type_name(*d))
                .range(type_name(*r))
        } else {
            PropertyDecl::data(format!("gen:prop{i}"))
                .domain(type_name(*d))
                .range("xsd:string")
        };
        facts = facts.with_property(decl);
    }
    facts
}

fn resolve_all(planner: &Planner, case: &SchemaCase) -> Vec<Resolution> {
    let mut out = Vec::new();
    for i in 0..case.type_count {
        out.push(planner.resolve(&type_name(i)).unwrap());
    }
    for i in 0..case.props.len() {
        out.push(planner.resolve(&format!("gen:prop{i}")).unwrap());
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn recalculation_is_deterministic(case in schema_case_strategy()) {
        let store: Arc<dyn IndexStore> = Arc::new(MemoryStore::new());
        let planner = Planner::new(store, PathConfig::default()).unwrap();

        let (_, first) = planner.add_vocabulary(build_vocab(&case)).unwrap();
        planner
            .add_seed(&type_name(case.seeded), "http://example.org/seed")
            .unwrap();
        let resolved_first = resolve_all(&planner, &case);

        // Identical content, full re-extraction and rebuild.
        let second = planner.analyse("gen").unwrap();
        let resolved_second = resolve_all(&planner, &case);

        prop_assert_eq!(first.cycles, second.cycles);
        prop_assert_eq!(first.walks, second.walks);
        prop_assert_eq!(resolved_first, resolved_second);
    }

    #[test]
    fn extracted_facts_keep_the_mirror_invariant(case in schema_case_strategy()) {
        let store: Arc<dyn IndexStore> = Arc::new(MemoryStore::new());
        let planner = Planner::new(store, PathConfig::default()).unwrap();
        planner.add_vocabulary(build_vocab(&case)).unwrap();

        let properties = planner.properties().unwrap();
        for ty in planner.types().unwrap() {
            let entry = planner.get_type(&ty).unwrap();
            for prop in &properties {
                let in_domain = planner.get_property(prop).unwrap().domain.contains(&ty);
                prop_assert_eq!(
                    entry.properties.contains(prop),
                    in_domain,
                    "mirror violated for {} / {}",
                    ty,
                    prop
                );
            }
        }
    }

    #[test]
    fn inverse_properties_mirror_domain_and_range(
        (d, r) in (0usize..3, 0usize..3)
    ) {
        let store: Arc<dyn IndexStore> = Arc::new(MemoryStore::new());
        let planner = Planner::new(store, PathConfig::default()).unwrap();
        let facts = VocabularyFacts::new("gen")
            .with_type(TypeDecl::new(type_name(0)))
            .with_type(TypeDecl::new(type_name(1)))
            .with_type(TypeDecl::new(type_name(2)))
            .with_property(
                PropertyDecl::object("gen:fwd")
                    .domain(type_name(d))
                    .range(type_name(r))
                    .inverse_of("gen:bwd"),
            )
            .with_property(
                PropertyDecl::object("gen:bwd")
                    .domain(type_name(r))
                    .range(type_name(d)),
            );
        planner.add_vocabulary(facts).unwrap();

        let fwd = planner.get_property("gen:fwd").unwrap();
        let bwd = planner.get_property("gen:bwd").unwrap();
        prop_assert_eq!(&fwd.domain, &bwd.range);
        prop_assert_eq!(&fwd.range, &bwd.domain);
    }
}
