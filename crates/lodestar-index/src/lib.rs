//! The persisted side of Lodestar: a namespaced set/ordered-set index store,
//! the per-vocabulary type/property index built on top of it, and the seed
//! registry.
//!
//! Everything in this crate reads and writes through the [`store::IndexStore`]
//! contract, so the same code runs against the embedded in-memory store or
//! any external KV engine that can honor the contract.

pub mod error;
pub mod seeds;
pub mod store;
pub mod vocab;

pub use error::IndexError;
pub use seeds::{Seed, SeedRegistry};
pub use store::{IndexStore, KeyGuard, MemoryStore, StoreError, WriteBatch};
pub use vocab::{PropertyEntry, TypeEntry, VocabIndex};
