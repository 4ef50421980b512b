//! Per-vocabulary type/property index.
//!
//! Key layout, one partition per vocabulary:
//!
//! ```text
//! vocabs:{vid}:types                         set of type names
//! vocabs:{vid}:types:{t}:super|sub|props|refs
//! vocabs:{vid}:properties                    set of property names
//! vocabs:{vid}:properties:{p}:domain|range|inverse
//! vocabs:{vid}:properties:{p}:kind           "object" | "data"
//! ```
//!
//! Cross-vocabulary subclassing and ranges are recorded per-partition, so a
//! mutation of one vocabulary re-extracts every foreign entry whose relation
//! sets touch it. Reads merge matching entries across all partitions.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use lodestar_schema::{qname_prefix, PropertyKind, SchemaCatalog};

use crate::error::IndexError;
use crate::seeds;
use crate::store::{IndexStore, WriteBatch};

/// Merged view of one type across all partitions.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TypeEntry {
    #[serde(rename = "super")]
    pub super_types: BTreeSet<String>,
    #[serde(rename = "sub")]
    pub sub_types: BTreeSet<String>,
    pub properties: BTreeSet<String>,
    pub refs: BTreeSet<String>,
}

/// Merged view of one property, inverse domains/ranges folded in.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PropertyEntry {
    pub domain: BTreeSet<String>,
    pub range: BTreeSet<String>,
    pub inverse: BTreeSet<String>,
    pub kind: PropertyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum UnitKind {
    Type,
    Property,
}

#[derive(Clone)]
pub struct VocabIndex {
    store: Arc<dyn IndexStore>,
}

impl VocabIndex {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        VocabIndex { store }
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    // ------------------------------------------------------------------
    // Extraction
    // ------------------------------------------------------------------

    /// Extracts `vid` from the catalog into its partition, re-extracting
    /// every foreign entry that depends on the new names. One bounded-pool
    /// task per type/property; blocks until all units finish. The first
    /// failing unit fails the whole extraction; committed units stay (a later
    /// extraction rebuilds them).
    pub fn extract(
        &self,
        vid: &str,
        catalog: &SchemaCatalog,
        pool: &rayon::ThreadPool,
    ) -> Result<(BTreeSet<String>, BTreeSet<String>), IndexError> {
        info!(vid, "extracting vocabulary");
        let started = Instant::now();

        self.scrub(vid)?;

        let types = catalog.types(Some(vid));
        let properties = catalog.properties(Some(vid));

        let mut units: BTreeSet<(String, String, UnitKind)> = BTreeSet::new();
        for t in &types {
            units.insert((vid.to_string(), t.clone(), UnitKind::Type));
        }
        for p in &properties {
            units.insert((vid.to_string(), p.clone(), UnitKind::Property));
        }
        self.collect_dependents(vid, &types, &properties, &mut units)?;

        debug!(vid, units = units.len(), "dispatching extraction units");
        pool.install(|| {
            units
                .par_iter()
                .try_for_each(|(owner, name, kind)| match kind {
                    UnitKind::Type => self.extract_type(catalog, owner, name),
                    UnitKind::Property => self.extract_property(catalog, owner, name),
                })
        })?;

        info!(
            vid,
            types = types.len(),
            properties = properties.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extraction done"
        );
        Ok((types, properties))
    }

    /// Foreign entries whose persisted relation sets intersect the incoming
    /// names: types via super/sub against new types and props/refs against
    /// new properties, properties via domain/range against new types.
    fn collect_dependents(
        &self,
        vid: &str,
        types: &BTreeSet<String>,
        properties: &BTreeSet<String>,
        units: &mut BTreeSet<(String, String, UnitKind)>,
    ) -> Result<(), IndexError> {
        for ovid in self.vocabularies()? {
            if ovid == vid {
                continue;
            }
            for oty in self.store.set_members(&k_types(&ovid))? {
                if types.contains(&oty) {
                    continue;
                }
                let entry = self.read_type(&oty)?;
                if !entry.super_types.is_disjoint(types)
                    || !entry.sub_types.is_disjoint(types)
                    || !entry.properties.is_disjoint(properties)
                    || !entry.refs.is_disjoint(properties)
                {
                    units.insert((ovid.clone(), oty, UnitKind::Type));
                }
            }
            for op in self.store.set_members(&k_properties(&ovid))? {
                let entry = self.read_property(&op)?;
                if !entry.domain.is_disjoint(types) || !entry.range.is_disjoint(types) {
                    units.insert((ovid.clone(), op, UnitKind::Property));
                }
            }
        }
        Ok(())
    }

    /// One extraction unit: replaces the persisted entry for (`vid`, `t`)
    /// with the catalog's current global closures, in one atomic batch.
    fn extract_type(&self, catalog: &SchemaCatalog, vid: &str, t: &str) -> Result<(), IndexError> {
        let mut batch = WriteBatch::new();
        batch.delete(k_type_rel(vid, t, "super"));
        batch.delete(k_type_rel(vid, t, "sub"));
        batch.delete(k_type_rel(vid, t, "props"));
        batch.delete(k_type_rel(vid, t, "refs"));
        batch.set_add(k_types(vid), [t.to_string()]);
        batch.set_add(k_type_rel(vid, t, "super"), catalog.supertypes(t, None));
        batch.set_add(k_type_rel(vid, t, "sub"), catalog.subtypes(t, None));
        batch.set_add(k_type_rel(vid, t, "props"), catalog.type_properties(t, None));
        batch.set_add(k_type_rel(vid, t, "refs"), catalog.type_refs(t, None));
        self.store.apply(batch)?;
        Ok(())
    }

    fn extract_property(
        &self,
        catalog: &SchemaCatalog,
        vid: &str,
        p: &str,
    ) -> Result<(), IndexError> {
        let kind = if catalog.is_object_property(p, None) {
            "object"
        } else {
            "data"
        };
        let mut batch = WriteBatch::new();
        batch.delete(k_prop_rel(vid, p, "domain"));
        batch.delete(k_prop_rel(vid, p, "range"));
        batch.delete(k_prop_rel(vid, p, "inverse"));
        batch.set_add(k_properties(vid), [p.to_string()]);
        batch.set_add(k_prop_rel(vid, p, "domain"), catalog.property_domain(p, None));
        batch.set_add(k_prop_rel(vid, p, "range"), catalog.property_range(p, None));
        batch.set_add(
            k_prop_rel(vid, p, "inverse"),
            catalog.property_inverses(p, None),
        );
        batch.value_put(k_prop_rel(vid, p, "kind"), kind);
        self.store.apply(batch)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Drops `vid`'s partition and scrubs its names from every other
    /// partition, so no surviving property references a deleted type. Does
    /// not touch seeds; `delete` layers the cascade on top.
    fn scrub(&self, vid: &str) -> Result<BTreeSet<String>, IndexError> {
        let v_types = self.store.set_members(&k_types(vid))?;
        if !v_types.is_empty() {
            self.remove_from_sets(
                &v_types,
                &[
                    "vocabs:*:domain",
                    "vocabs:*:range",
                    "vocabs:*:sub",
                    "vocabs:*:super",
                ],
            )?;
        }
        let v_props = self.store.set_members(&k_properties(vid))?;
        if !v_props.is_empty() {
            self.remove_from_sets(&v_props, &["vocabs:*:refs", "vocabs:*:props"])?;
        }
        let keys = self.store.keys(&format!("vocabs:{vid}:*"))?;
        self.store.delete_keys(&keys)?;
        Ok(v_types)
    }

    /// Foreign-key-style cleanup across partitions. A name is never removed
    /// from keys of its own vocabulary's partition: those are deleted
    /// wholesale with the partition itself.
    fn remove_from_sets(
        &self,
        values: &BTreeSet<String>,
        patterns: &[&str],
    ) -> Result<(), IndexError> {
        let mut batch = WriteBatch::new();
        for pattern in patterns {
            for key in self.store.keys(pattern)? {
                let partition = key.split(':').nth(1).unwrap_or_default();
                let effective: Vec<String> = values
                    .iter()
                    .filter(|v| qname_prefix(v) != partition)
                    .cloned()
                    .collect();
                batch.set_remove(key, effective);
            }
        }
        self.store.apply(batch)?;
        Ok(())
    }

    /// Removes the vocabulary from the index and cascades seed removal for
    /// every type of it that no longer exists in any partition.
    pub fn delete(&self, vid: &str) -> Result<(), IndexError> {
        info!(vid, "deleting vocabulary from index");
        let v_types = self.scrub(vid)?;
        for t in v_types {
            if !self.is_type(&t)? {
                seeds::purge_type(self.store.as_ref(), &t)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads (merged across partitions)
    // ------------------------------------------------------------------

    pub fn vocabularies(&self) -> Result<Vec<String>, IndexError> {
        let mut out = Vec::new();
        for key in self.store.keys("vocabs:*:types")? {
            if let Some(vid) = key.split(':').nth(1) {
                if !out.iter().any(|v| v == vid) {
                    out.push(vid.to_string());
                }
            }
        }
        Ok(out)
    }

    pub fn get_types(&self, vid: Option<&str>) -> Result<BTreeSet<String>, IndexError> {
        self.union_sets(vid, "types")
    }

    pub fn get_properties(&self, vid: Option<&str>) -> Result<BTreeSet<String>, IndexError> {
        self.union_sets(vid, "properties")
    }

    fn union_sets(&self, vid: Option<&str>, suffix: &str) -> Result<BTreeSet<String>, IndexError> {
        let pattern = match vid {
            Some(vid) => format!("vocabs:{vid}:{suffix}"),
            None => format!("vocabs:*:{suffix}"),
        };
        let mut out = BTreeSet::new();
        for key in self.store.keys(&pattern)? {
            out.extend(self.store.set_members(&key)?);
        }
        Ok(out)
    }

    pub fn is_type(&self, ty: &str) -> Result<bool, IndexError> {
        for key in self.store.keys("vocabs:*:types")? {
            if self.store.set_contains(&key, ty)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn is_property(&self, prop: &str) -> Result<bool, IndexError> {
        for key in self.store.keys("vocabs:*:properties")? {
            if self.store.set_contains(&key, prop)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn get_type(&self, ty: &str) -> Result<TypeEntry, IndexError> {
        if !self.is_type(ty)? {
            return Err(IndexError::NotFound(format!("unknown type `{ty}`")));
        }
        self.read_type(ty)
    }

    fn read_type(&self, ty: &str) -> Result<TypeEntry, IndexError> {
        Ok(TypeEntry {
            super_types: self.union_pattern(&format!("vocabs:*:types:{ty}:super"))?,
            sub_types: self.union_pattern(&format!("vocabs:*:types:{ty}:sub"))?,
            properties: self.union_pattern(&format!("vocabs:*:types:{ty}:props"))?,
            refs: self.union_pattern(&format!("vocabs:*:types:{ty}:refs"))?,
        })
    }

    /// Merged property view. Inverse properties contribute their range to the
    /// domain and their domain to the range: traversing `p` backwards is
    /// traversing any inverse forwards.
    pub fn get_property(&self, prop: &str) -> Result<PropertyEntry, IndexError> {
        if !self.is_property(prop)? {
            return Err(IndexError::NotFound(format!("unknown property `{prop}`")));
        }
        self.read_property(prop)
    }

    fn read_property(&self, prop: &str) -> Result<PropertyEntry, IndexError> {
        let mut domain = self.union_pattern(&format!("vocabs:*:properties:{prop}:domain"))?;
        let mut range = self.union_pattern(&format!("vocabs:*:properties:{prop}:range"))?;
        let inverse = self.union_pattern(&format!("vocabs:*:properties:{prop}:inverse"))?;

        for inv in &inverse {
            domain.extend(self.union_pattern(&format!("vocabs:*:properties:{inv}:range"))?);
            range.extend(self.union_pattern(&format!("vocabs:*:properties:{inv}:domain"))?);
        }

        let mut kind = PropertyKind::Object;
        for key in self.store.keys(&format!("vocabs:*:properties:{prop}:kind"))? {
            if let Some(value) = self.store.value_get(&key)? {
                kind = match value.as_str() {
                    "data" => PropertyKind::Data,
                    _ => PropertyKind::Object,
                };
                break;
            }
        }

        Ok(PropertyEntry {
            domain,
            range,
            inverse,
            kind,
        })
    }

    fn union_pattern(&self, pattern: &str) -> Result<BTreeSet<String>, IndexError> {
        let mut out = BTreeSet::new();
        for key in self.store.keys(pattern)? {
            out.extend(self.store.set_members(&key)?);
        }
        Ok(out)
    }
}

fn k_types(vid: &str) -> String {
    format!("vocabs:{vid}:types")
}

fn k_properties(vid: &str) -> String {
    format!("vocabs:{vid}:properties")
}

fn k_type_rel(vid: &str, t: &str, rel: &str) -> String {
    format!("vocabs:{vid}:types:{t}:{rel}")
}

fn k_prop_rel(vid: &str, p: &str, rel: &str) -> String {
    format!("vocabs:{vid}:properties:{p}:{rel}")
}
