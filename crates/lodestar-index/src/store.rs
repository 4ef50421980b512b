//! Index-store contract and the embedded implementation.
//!
//! The store is a namespaced KV space with three entry kinds (member sets,
//! rank-ordered lists and plain values) plus `*`-glob key enumeration,
//! atomic multi-key batches and per-key mutual-exclusion locks. The contract
//! is technology-agnostic: [`MemoryStore`] keeps everything in process (with
//! an optional bincode snapshot on disk), and an external KV server could
//! stand in without touching any caller.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("index store i/o failure: {0}")]
    Io(String),
    #[error("key `{key}` holds a different entry kind")]
    WrongKind { key: String },
    #[error("snapshot codec failure: {0}")]
    Codec(String),
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

// ============================================================================
// Contract
// ============================================================================

/// One write in an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Delete(String),
    SetAdd(String, Vec<String>),
    SetRemove(String, Vec<String>),
    /// Appends members at the end of a rank-ordered list, in the given order.
    RankedPush(String, Vec<String>),
    ValuePut(String, String),
}

/// An ordered batch of writes, applied atomically: readers observe either
/// none of it or all of it.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    pub(crate) ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete(key.into()));
        self
    }

    pub fn set_add<I, S>(&mut self, key: impl Into<String>, members: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: Vec<String> = members.into_iter().map(Into::into).collect();
        if !members.is_empty() {
            self.ops.push(WriteOp::SetAdd(key.into(), members));
        }
        self
    }

    pub fn set_remove<I, S>(&mut self, key: impl Into<String>, members: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: Vec<String> = members.into_iter().map(Into::into).collect();
        if !members.is_empty() {
            self.ops.push(WriteOp::SetRemove(key.into(), members));
        }
        self
    }

    pub fn ranked_push<I, S>(&mut self, key: impl Into<String>, members: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: Vec<String> = members.into_iter().map(Into::into).collect();
        if !members.is_empty() {
            self.ops.push(WriteOp::RankedPush(key.into(), members));
        }
        self
    }

    pub fn value_put(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::ValuePut(key.into(), value.into()));
        self
    }
}

/// Held per-key mutual exclusion. Dropping the guard releases the key.
pub struct KeyGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
}

pub trait IndexStore: Send + Sync {
    /// Keys currently present that match a `*`-glob pattern, in stable order.
    fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    fn set_members(&self, key: &str) -> Result<BTreeSet<String>, StoreError>;

    fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Members of a rank-ordered list, rank ascending.
    fn ranked_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    fn value_get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Applies a batch atomically.
    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Acquires the mutual-exclusion lock for one key, blocking while any
    /// other holder keeps it.
    fn lock(&self, key: &str) -> KeyGuard;
}

// Convenience wrapper used all over the index code.
impl dyn IndexStore {
    pub fn delete_keys(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        for key in keys {
            batch.delete(key.clone());
        }
        self.apply(batch)
    }
}

// ============================================================================
// Glob matching
// ============================================================================

/// Anchored `*`-glob match; `*` spans any run of characters, `:` included.
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == key;
    }
    let mut rest = match key.strip_prefix(segments[0]) {
        Some(rest) => rest,
        None => return false,
    };
    let last = segments.len() - 1;
    for segment in &segments[1..last] {
        if segment.is_empty() {
            continue;
        }
        match rest.find(segment) {
            Some(pos) => rest = &rest[pos + segment.len()..],
            None => return false,
        }
    }
    segments[last].is_empty() || rest.ends_with(segments[last])
}

// ============================================================================
// Embedded store
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
enum Entry {
    Set(BTreeSet<String>),
    Ranked(Vec<String>),
    Value(String),
}

/// In-process store: one `RwLock`ed ordered map (atomic batches, stable key
/// enumeration) plus a lock registry for per-key guards. Optionally snapshots
/// to a bincode file for embedded persistence.
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Entry>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    snapshot: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            data: RwLock::new(BTreeMap::new()),
            locks: DashMap::new(),
            snapshot: None,
        }
    }

    /// Opens a snapshot-backed store, loading prior contents when the file
    /// exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            bincode::deserialize(&bytes).map_err(|e| StoreError::Codec(e.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(MemoryStore {
            data: RwLock::new(data),
            locks: DashMap::new(),
            snapshot: Some(path),
        })
    }

    /// Writes the current contents to the snapshot file, if one is
    /// configured. Write-then-rename so a crash never truncates the old
    /// snapshot.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = self.snapshot.as_ref() else {
            return Ok(());
        };
        let data = self.data.read();
        let bytes = bincode::serialize(&*data).map_err(|e| StoreError::Codec(e.to_string()))?;
        drop(data);
        let tmp = tmp_path(path);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "store snapshot saved");
        Ok(())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.data.read().len()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

impl IndexStore for MemoryStore {
    fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let data = self.data.read();
        Ok(data
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect())
    }

    fn set_members(&self, key: &str) -> Result<BTreeSet<String>, StoreError> {
        let data = self.data.read();
        match data.get(key) {
            None => Ok(BTreeSet::new()),
            Some(Entry::Set(members)) => Ok(members.clone()),
            Some(_) => Err(StoreError::WrongKind { key: key.into() }),
        }
    }

    fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let data = self.data.read();
        match data.get(key) {
            None => Ok(false),
            Some(Entry::Set(members)) => Ok(members.contains(member)),
            Some(_) => Err(StoreError::WrongKind { key: key.into() }),
        }
    }

    fn ranked_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let data = self.data.read();
        match data.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Ranked(members)) => Ok(members.clone()),
            Some(_) => Err(StoreError::WrongKind { key: key.into() }),
        }
    }

    fn value_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let data = self.data.read();
        match data.get(key) {
            None => Ok(None),
            Some(Entry::Value(v)) => Ok(Some(v.clone())),
            Some(_) => Err(StoreError::WrongKind { key: key.into() }),
        }
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut data = self.data.write();
        for op in batch.ops {
            match op {
                WriteOp::Delete(key) => {
                    data.remove(&key);
                }
                WriteOp::SetAdd(key, members) => match data
                    .entry(key.clone())
                    .or_insert_with(|| Entry::Set(BTreeSet::new()))
                {
                    Entry::Set(set) => set.extend(members),
                    _ => return Err(StoreError::WrongKind { key }),
                },
                WriteOp::SetRemove(key, members) => {
                    let remove_entry = match data.get_mut(&key) {
                        None => false,
                        Some(Entry::Set(set)) => {
                            for member in &members {
                                set.remove(member);
                            }
                            set.is_empty()
                        }
                        Some(_) => return Err(StoreError::WrongKind { key }),
                    };
                    if remove_entry {
                        data.remove(&key);
                    }
                }
                WriteOp::RankedPush(key, members) => match data
                    .entry(key.clone())
                    .or_insert_with(|| Entry::Ranked(Vec::new()))
                {
                    Entry::Ranked(list) => list.extend(members),
                    _ => return Err(StoreError::WrongKind { key }),
                },
                WriteOp::ValuePut(key, value) => {
                    data.insert(key, Entry::Value(value));
                }
            }
        }
        Ok(())
    }

    fn lock(&self, key: &str) -> KeyGuard {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyGuard {
            _guard: mutex.lock_arc(),
        }
    }
}
