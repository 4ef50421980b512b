//! Facade over the schema catalog, vocabulary index, seed registry and the
//! recalculation engine. One `Planner` is the whole planning layer: servers
//! hold it behind an `Arc`, tests drive it directly.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use lodestar_index::{IndexError, IndexStore, Seed, SeedRegistry, VocabIndex};
use lodestar_schema::{SchemaCatalog, VocabularyFacts};

use crate::engine::{self, RecalcSummary};
use crate::resolve::{self, Resolution};
use crate::PathConfig;

pub struct Planner {
    catalog: RwLock<SchemaCatalog>,
    index: VocabIndex,
    seeds: SeedRegistry,
    pool: rayon::ThreadPool,
    config: PathConfig,
}

impl Planner {
    pub fn new(store: Arc<dyn IndexStore>, config: PathConfig) -> Result<Self, IndexError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| IndexError::Validation(format!("worker pool: {e}")))?;
        Ok(Planner {
            catalog: RwLock::new(SchemaCatalog::new()),
            index: VocabIndex::new(store.clone()),
            seeds: SeedRegistry::new(store),
            pool,
            config,
        })
    }

    // ------------------------------------------------------------------
    // Vocabularies
    // ------------------------------------------------------------------

    /// Stores the classified document without touching the index. Callers
    /// that want deferred analysis (the HTTP surface) pair this with
    /// [`Planner::analyse`]; everyone else uses [`Planner::add_vocabulary`].
    pub fn store_vocabulary(&self, facts: VocabularyFacts) -> Result<String, IndexError> {
        Ok(self.catalog.write().add(facts)?)
    }

    pub fn replace_vocabulary(&self, vid: &str, facts: VocabularyFacts) -> Result<(), IndexError> {
        Ok(self.catalog.write().update(vid, facts)?)
    }

    /// Extraction plus full recalculation for one vocabulary. Also the
    /// cleanup pass after a removal: extracting a vid that is no longer in
    /// the catalog scrubs its partition and rebuilds the catalogue.
    pub fn analyse(&self, vid: &str) -> Result<RecalcSummary, IndexError> {
        {
            let catalog = self.catalog.read();
            self.index.extract(vid, &catalog, &self.pool)?;
        }
        engine::recalculate(&self.index, &self.pool, &self.config)
    }

    pub fn add_vocabulary(
        &self,
        facts: VocabularyFacts,
    ) -> Result<(String, RecalcSummary), IndexError> {
        let vid = self.store_vocabulary(facts)?;
        let summary = self.analyse(&vid)?;
        Ok((vid, summary))
    }

    pub fn update_vocabulary(
        &self,
        vid: &str,
        facts: VocabularyFacts,
    ) -> Result<RecalcSummary, IndexError> {
        self.replace_vocabulary(vid, facts)?;
        self.analyse(vid)
    }

    /// Removes the vocabulary, scrubs the index (cascading seeds of types
    /// that no longer exist) and rebuilds the catalogue.
    pub fn delete_vocabulary(&self, vid: &str) -> Result<RecalcSummary, IndexError> {
        self.drop_vocabulary(vid)?;
        self.purge_vocabulary(vid)
    }

    /// Catalog-only removal; the index cleanup half of a delete. The HTTP
    /// surface runs this synchronously and defers [`Planner::purge_vocabulary`]
    /// to a background job.
    pub fn drop_vocabulary(&self, vid: &str) -> Result<(), IndexError> {
        self.catalog.write().remove(vid)?;
        info!(vid, "vocabulary removed");
        Ok(())
    }

    /// Index scrub (with seed cascade) and full recalculation for a
    /// vocabulary no longer in the catalog.
    pub fn purge_vocabulary(&self, vid: &str) -> Result<RecalcSummary, IndexError> {
        self.index.delete(vid)?;
        engine::recalculate(&self.index, &self.pool, &self.config)
    }

    pub fn vocabularies(&self) -> Vec<String> {
        self.catalog.read().contexts()
    }

    pub fn vocabulary(&self, vid: &str) -> Result<VocabularyFacts, IndexError> {
        Ok(self.catalog.read().get(vid)?.clone())
    }

    // ------------------------------------------------------------------
    // Index reads
    // ------------------------------------------------------------------

    pub fn types(&self) -> Result<std::collections::BTreeSet<String>, IndexError> {
        self.index.get_types(None)
    }

    pub fn properties(&self) -> Result<std::collections::BTreeSet<String>, IndexError> {
        self.index.get_properties(None)
    }

    pub fn get_type(&self, ty: &str) -> Result<lodestar_index::TypeEntry, IndexError> {
        self.index.get_type(ty)
    }

    pub fn get_property(&self, prop: &str) -> Result<lodestar_index::PropertyEntry, IndexError> {
        self.index.get_property(prop)
    }

    // ------------------------------------------------------------------
    // Seeds
    // ------------------------------------------------------------------

    pub fn add_seed(&self, ty: &str, uri: &str) -> Result<String, IndexError> {
        self.seeds.add_seed(ty, uri)
    }

    pub fn get_seed(&self, id: &str) -> Result<Seed, IndexError> {
        self.seeds.get_seed(id)
    }

    pub fn delete_seed(&self, id: &str) -> Result<(), IndexError> {
        self.seeds.delete_seed(id)
    }

    pub fn type_seeds(&self, ty: &str) -> Result<std::collections::BTreeSet<String>, IndexError> {
        self.seeds.get_type_seeds(ty)
    }

    pub fn seeds(&self) -> Result<Vec<Seed>, IndexError> {
        self.seeds.get_seeds()
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    pub fn resolve(&self, elm: &str) -> Result<Resolution, IndexError> {
        resolve::resolve(&self.index, &self.seeds, elm)
    }
}
