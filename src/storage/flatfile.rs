//! Flat-file key-value backend for sandboxed targets
//!
//! Fallback backend where an embedded database is unavailable (restricted
//! app sandboxes). One file per key under `<root>/<owner>/`; file names are
//! the hex encoding of the key bytes, so arbitrary keys never produce
//! path-hostile or colliding names and `list_keys` can decode them back.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreResult;
use crate::storage::StorageBackend;

/// Owner-partitioned key-value store over plain files
pub struct FlatFileBackend {
    root: PathBuf,
}

impl FlatFileBackend {
    /// Open or create the store rooted at `dir`
    pub fn open_at(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            root: dir.to_path_buf(),
        })
    }

    fn owner_dir(&self, owner: &str) -> PathBuf {
        self.root.join(hex::encode(owner))
    }

    fn key_path(&self, owner: &str, key: &str) -> PathBuf {
        self.owner_dir(owner).join(hex::encode(key))
    }
}

impl StorageBackend for FlatFileBackend {
    fn get(&self, owner: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match std::fs::read(self.key_path(owner, key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, owner: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let dir = self.owner_dir(owner);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(self.key_path(owner, key), value)?;
        Ok(())
    }

    fn delete(&self, owner: &str, key: &str) -> StoreResult<bool> {
        match std::fs::remove_file(self.key_path(owner, key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_keys(&self, owner: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let dir = self.owner_dir(owner);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Ok(raw) = hex::decode(name) else {
                log::warn!("Skipping undecodable storage file {:?}", name);
                continue;
            };
            let Ok(key) = String::from_utf8(raw) else {
                continue;
            };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
