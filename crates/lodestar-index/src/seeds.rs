//! Seed registry: concrete instance URIs registered per type.
//!
//! Keys: `seeds:{type}` holds the URI set, `seeds:id:{id}` maps the opaque
//! seed identifier back to its (type, uri) pair. The identifier is a sha256
//! surrogate of the pair, so re-registering after a delete yields the same
//! id.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::IndexError;
use crate::store::{IndexStore, WriteBatch};
use crate::vocab::VocabIndex;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seed {
    #[serde(rename = "type")]
    pub ty: String,
    pub uri: String,
}

#[derive(Clone)]
pub struct SeedRegistry {
    store: Arc<dyn IndexStore>,
}

impl SeedRegistry {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        SeedRegistry { store }
    }

    /// Registers `uri` as a seed of `ty` and returns the seed id.
    pub fn add_seed(&self, ty: &str, uri: &str) -> Result<String, IndexError> {
        url::Url::parse(uri)
            .map_err(|e| IndexError::Validation(format!("invalid seed uri `{uri}`: {e}")))?;
        let index = VocabIndex::new(self.store.clone());
        if !index.is_type(ty)? {
            return Err(IndexError::NotFound(format!(
                "`{ty}` is not a declared type"
            )));
        }
        if self.store.set_contains(&k_type_seeds(ty), uri)? {
            return Err(IndexError::Conflict(format!(
                "`{uri}` is already registered as a seed of `{ty}`"
            )));
        }

        let id = seed_id(ty, uri);
        let descriptor = serde_json::to_string(&Seed {
            ty: ty.to_string(),
            uri: uri.to_string(),
        })
        .map_err(|e| IndexError::Validation(e.to_string()))?;

        let mut batch = WriteBatch::new();
        batch.set_add(k_type_seeds(ty), [uri.to_string()]);
        batch.value_put(k_seed_id(&id), descriptor);
        self.store.apply(batch)?;

        debug!(ty, uri, id = %id, "seed registered");
        Ok(id)
    }

    pub fn get_seed(&self, id: &str) -> Result<Seed, IndexError> {
        let seed = self.lookup(id)?;
        if !self.store.set_contains(&k_type_seeds(&seed.ty), &seed.uri)? {
            return Err(IndexError::InvalidSeed(id.to_string()));
        }
        Ok(seed)
    }

    pub fn delete_seed(&self, id: &str) -> Result<(), IndexError> {
        let seed = self.get_seed(id)?;
        let mut batch = WriteBatch::new();
        batch.set_remove(k_type_seeds(&seed.ty), [seed.uri]);
        batch.delete(k_seed_id(id));
        self.store.apply(batch)?;
        Ok(())
    }

    fn lookup(&self, id: &str) -> Result<Seed, IndexError> {
        let Some(descriptor) = self.store.value_get(&k_seed_id(id))? else {
            return Err(IndexError::InvalidSeed(id.to_string()));
        };
        serde_json::from_str(&descriptor).map_err(|_| IndexError::InvalidSeed(id.to_string()))
    }

    /// Seed URIs of a declared type; unknown types are an error.
    pub fn get_type_seeds(&self, ty: &str) -> Result<BTreeSet<String>, IndexError> {
        let index = VocabIndex::new(self.store.clone());
        if !index.is_type(ty)? {
            return Err(IndexError::NotFound(format!(
                "`{ty}` is not a declared type"
            )));
        }
        self.seeds_of(ty)
    }

    /// Seed URIs without the type-existence check: a name that is not an
    /// indexed type simply has no seeds. The path resolver scans walk steps
    /// with this.
    pub fn seeds_of(&self, ty: &str) -> Result<BTreeSet<String>, IndexError> {
        Ok(self.store.set_members(&k_type_seeds(ty))?)
    }

    /// Every registered seed, ordered by type then uri.
    pub fn get_seeds(&self) -> Result<Vec<Seed>, IndexError> {
        let mut out = Vec::new();
        for key in self.store.keys("seeds:*")? {
            if key.starts_with("seeds:id:") {
                continue;
            }
            let ty = &key["seeds:".len()..];
            for uri in self.store.set_members(&key)? {
                out.push(Seed {
                    ty: ty.to_string(),
                    uri,
                });
            }
        }
        Ok(out)
    }
}

/// Drops every seed of `ty` along with the id lookups. Used by the
/// vocabulary deletion cascade.
pub(crate) fn purge_type(store: &dyn IndexStore, ty: &str) -> Result<(), IndexError> {
    let uris = store.set_members(&k_type_seeds(ty))?;
    if uris.is_empty() {
        return Ok(());
    }
    debug!(ty, seeds = uris.len(), "cascading seed removal");
    let mut batch = WriteBatch::new();
    batch.delete(k_type_seeds(ty));
    for uri in &uris {
        batch.delete(k_seed_id(&seed_id(ty, uri)));
    }
    store.apply(batch)?;
    Ok(())
}

fn k_type_seeds(ty: &str) -> String {
    format!("seeds:{ty}")
}

fn k_seed_id(id: &str) -> String {
    format!("seeds:id:{id}")
}

/// Surrogate id for a (type, uri) pair: truncated hex sha256.
pub fn seed_id(ty: &str, uri: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ty.as_bytes());
    hasher.update([0u8]);
    hasher.update(uri.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for b in digest[..16].iter() {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
