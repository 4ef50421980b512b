//! Multi-vocabulary catalog with closure accessors.
//!
//! Every accessor takes an optional vocabulary scope. Unscoped calls work on
//! the union of all registered vocabularies, which is what extraction uses:
//! subclass chains and property domains routinely cross vocabulary borders.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::{PropertyDecl, PropertyKind, QName, TypeDecl, VocabularyError, VocabularyFacts};

#[derive(Debug, Default, Clone)]
pub struct SchemaCatalog {
    contexts: BTreeMap<String, VocabularyFacts>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered vocabulary identifiers, in stable order.
    pub fn contexts(&self) -> Vec<String> {
        self.contexts.keys().cloned().collect()
    }

    pub fn contains(&self, vid: &str) -> bool {
        self.contexts.contains_key(vid)
    }

    pub fn get(&self, vid: &str) -> Result<&VocabularyFacts, VocabularyError> {
        self.contexts
            .get(vid)
            .ok_or_else(|| VocabularyError::Unknown(vid.to_string()))
    }

    pub fn add(&mut self, facts: VocabularyFacts) -> Result<String, VocabularyError> {
        if self.contexts.contains_key(&facts.vid) {
            return Err(VocabularyError::Duplicate(facts.vid));
        }
        let vid = facts.vid.clone();
        debug!(vid = %vid, types = facts.types.len(), properties = facts.properties.len(),
               "registering vocabulary");
        self.contexts.insert(vid.clone(), facts);
        Ok(vid)
    }

    /// Replaces a vocabulary wholesale. The document must carry the same
    /// identifier it is registered under.
    pub fn update(&mut self, vid: &str, facts: VocabularyFacts) -> Result<(), VocabularyError> {
        if facts.vid != vid {
            return Err(VocabularyError::IdMismatch {
                expected: vid.to_string(),
                found: facts.vid,
            });
        }
        if !self.contexts.contains_key(vid) {
            return Err(VocabularyError::Unknown(vid.to_string()));
        }
        self.contexts.insert(vid.to_string(), facts);
        Ok(())
    }

    pub fn remove(&mut self, vid: &str) -> Result<VocabularyFacts, VocabularyError> {
        self.contexts
            .remove(vid)
            .ok_or_else(|| VocabularyError::Unknown(vid.to_string()))
    }

    fn scoped<'a>(
        &'a self,
        scope: Option<&'a str>,
    ) -> impl Iterator<Item = &'a VocabularyFacts> + 'a {
        self.contexts
            .values()
            .filter(move |f| scope.is_none_or(|vid| f.vid == vid))
    }

    fn type_decls<'a>(
        &'a self,
        scope: Option<&'a str>,
    ) -> impl Iterator<Item = &'a TypeDecl> + 'a {
        self.scoped(scope).flat_map(|f| f.types.iter())
    }

    fn property_decls<'a>(
        &'a self,
        name: Option<&'a str>,
        scope: Option<&'a str>,
    ) -> impl Iterator<Item = &'a PropertyDecl> {
        self.scoped(scope)
            .flat_map(|f| f.properties.iter())
            .filter(move |p| name.is_none_or(|n| p.name == n))
    }

    /// Every type name visible in scope: declared types, superclass targets,
    /// and the domain/range classes of object properties.
    pub fn types(&self, scope: Option<&str>) -> BTreeSet<QName> {
        let mut out = BTreeSet::new();
        for decl in self.type_decls(scope) {
            out.insert(decl.name.clone());
            out.extend(decl.subclass_of.iter().cloned());
        }
        for prop in self.property_decls(None, scope) {
            if prop.kind == PropertyKind::Object {
                out.extend(prop.domain.iter().cloned());
                out.extend(prop.range.iter().cloned());
            }
        }
        out
    }

    pub fn properties(&self, scope: Option<&str>) -> BTreeSet<QName> {
        self.property_decls(None, scope)
            .map(|p| p.name.clone())
            .collect()
    }

    /// Transitive supertypes of `ty`, excluding `ty` itself.
    pub fn supertypes(&self, ty: &str, scope: Option<&str>) -> BTreeSet<QName> {
        self.closure(ty, scope, false)
    }

    /// Transitive subtypes of `ty`, excluding `ty` itself.
    pub fn subtypes(&self, ty: &str, scope: Option<&str>) -> BTreeSet<QName> {
        self.closure(ty, scope, true)
    }

    fn closure(&self, ty: &str, scope: Option<&str>, downward: bool) -> BTreeSet<QName> {
        // Edges run sub -> super; the downward closure walks them backwards.
        let mut edges: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for decl in self.type_decls(scope) {
            for sup in &decl.subclass_of {
                let (from, to) = if downward {
                    (sup.as_str(), decl.name.as_str())
                } else {
                    (decl.name.as_str(), sup.as_str())
                };
                edges.entry(from).or_default().insert(to);
            }
        }
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([ty]);
        while let Some(cur) = queue.pop_front() {
            if let Some(nexts) = edges.get(cur) {
                for &next in nexts {
                    if next != ty && seen.insert(next.to_string()) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// Properties applicable to `ty`: those whose declared domain names `ty`
    /// or any of its supertypes.
    pub fn type_properties(&self, ty: &str, scope: Option<&str>) -> BTreeSet<QName> {
        let mut selves = self.supertypes(ty, scope);
        selves.insert(ty.to_string());
        self.property_decls(None, scope)
            .filter(|p| p.domain.iter().any(|d| selves.contains(d)))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Object properties that can reference an instance of `ty`: declared
    /// range names `ty` or any of its supertypes.
    pub fn type_refs(&self, ty: &str, scope: Option<&str>) -> BTreeSet<QName> {
        let mut selves = self.supertypes(ty, scope);
        selves.insert(ty.to_string());
        self.property_decls(None, scope)
            .filter(|p| p.kind == PropertyKind::Object)
            .filter(|p| p.range.iter().any(|r| selves.contains(r)))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Declared domain of `prop`, expanded with the subtypes of each declared
    /// domain type (an instance of a subtype carries the property too).
    pub fn property_domain(&self, prop: &str, scope: Option<&str>) -> BTreeSet<QName> {
        let mut out = BTreeSet::new();
        for decl in self.property_decls(Some(prop), scope) {
            for d in &decl.domain {
                out.extend(self.subtypes(d, scope));
                out.insert(d.clone());
            }
        }
        out
    }

    /// Declared range of `prop`. Object property ranges expand with their
    /// subtypes; data property ranges are datatypes and stay as declared.
    pub fn property_range(&self, prop: &str, scope: Option<&str>) -> BTreeSet<QName> {
        let object = self.is_object_property(prop, scope);
        let mut out = BTreeSet::new();
        for decl in self.property_decls(Some(prop), scope) {
            for r in &decl.range {
                if object {
                    out.extend(self.subtypes(r, scope));
                }
                out.insert(r.clone());
            }
        }
        out
    }

    /// Inverse links are symmetric regardless of which side declared them.
    pub fn property_inverses(&self, prop: &str, scope: Option<&str>) -> BTreeSet<QName> {
        let mut out = BTreeSet::new();
        for decl in self.property_decls(Some(prop), scope) {
            out.extend(decl.inverse_of.iter().cloned());
        }
        for decl in self.property_decls(None, scope) {
            if decl.inverse_of.iter().any(|i| i == prop) {
                out.insert(decl.name.clone());
            }
        }
        out
    }

    pub fn is_object_property(&self, prop: &str, scope: Option<&str>) -> bool {
        self.property_decls(Some(prop), scope)
            .any(|p| p.kind == PropertyKind::Object)
    }
}
