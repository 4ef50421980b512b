//! Classified vocabulary facts and the multi-vocabulary schema catalog.
//!
//! Lodestar does not parse ontology documents itself. A schema collaborator
//! (RDF/OWL toolchain, or test fixtures) classifies each vocabulary into
//! [`VocabularyFacts`]: type declarations with their superclass links, and
//! property declarations with domain/range/inverse links. [`SchemaCatalog`]
//! then answers the closure queries the vocabulary
//! index needs: transitive super/subtypes, inherited type properties and
//! references, and subtype-expanded property domains and ranges, merged
//! across every registered vocabulary or scoped to a single one.

pub mod catalog;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalog::SchemaCatalog;

/// Qualified name of a schema element, `prefix:Local`. The prefix is the
/// identifier of the vocabulary that coined the name.
pub type QName = String;

/// Returns the vocabulary prefix of a qualified name, or the whole name when
/// it carries no prefix.
pub fn qname_prefix(name: &str) -> &str {
    name.split(':').next().unwrap_or(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    /// Values are instances of schema types.
    Object,
    /// Values are literals; the range names a datatype, not a type node.
    Data,
}

impl Default for PropertyKind {
    fn default() -> Self {
        PropertyKind::Object
    }
}

/// One classified type: its name plus the direct superclass links the
/// document declares. Transitive closure is the catalog's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: QName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subclass_of: Vec<QName>,
}

/// One classified property with its directly declared domain, range and
/// inverse links.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyDecl {
    pub name: QName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<QName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub range: Vec<QName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inverse_of: Vec<QName>,
    #[serde(default)]
    pub kind: PropertyKind,
}

/// A classified vocabulary document, keyed by its prefix identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabularyFacts {
    pub vid: String,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub properties: Vec<PropertyDecl>,
}

impl VocabularyFacts {
    pub fn new(vid: impl Into<String>) -> Self {
        VocabularyFacts {
            vid: vid.into(),
            types: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }

    pub fn with_property(mut self, decl: PropertyDecl) -> Self {
        self.properties.push(decl);
        self
    }
}

impl TypeDecl {
    pub fn new(name: impl Into<QName>) -> Self {
        TypeDecl {
            name: name.into(),
            subclass_of: Vec::new(),
        }
    }

    pub fn subclass_of(mut self, sup: impl Into<QName>) -> Self {
        self.subclass_of.push(sup.into());
        self
    }
}

impl PropertyDecl {
    pub fn object(name: impl Into<QName>) -> Self {
        PropertyDecl {
            name: name.into(),
            kind: PropertyKind::Object,
            ..Default::default()
        }
    }

    pub fn data(name: impl Into<QName>) -> Self {
        PropertyDecl {
            name: name.into(),
            kind: PropertyKind::Data,
            ..Default::default()
        }
    }

    pub fn domain(mut self, ty: impl Into<QName>) -> Self {
        self.domain.push(ty.into());
        self
    }

    pub fn range(mut self, ty: impl Into<QName>) -> Self {
        self.range.push(ty.into());
        self
    }

    pub fn inverse_of(mut self, prop: impl Into<QName>) -> Self {
        self.inverse_of.push(prop.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyError {
    #[error("vocabulary `{0}` is already registered")]
    Duplicate(String),
    #[error("vocabulary `{0}` is not known")]
    Unknown(String),
    #[error("vocabulary identifiers do not match: updating `{expected}` with a document for `{found}`")]
    IdMismatch { expected: String, found: String },
}
