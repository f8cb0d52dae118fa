//! Cross-platform storage abstraction
//!
//! Two physical backends behind one owner-partitioned interface: an embedded
//! SQLite database on native targets and a flat-file key-value store on
//! sandboxed ones. Exactly one primary is selected when the store opens;
//! both present identical semantics, including immediate put→get visibility
//! within a session and last-write-wins on same-key writes.

pub mod flatfile;
pub mod sqlite;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::error::{StoreError, StoreResult};

pub use flatfile::FlatFileBackend;
pub use sqlite::SqliteBackend;

/// Marker key written into the primary backend once an owner's fallback data
/// has been copied forward. Lives outside every logical table prefix.
const MIGRATED_MARKER: &str = "__backup_migrated__";

/// Owner-partitioned byte-oriented storage contract.
///
/// Both physical backends implement this with identical semantics; owner A's
/// keys are never visible under owner B.
pub trait StorageBackend: Send {
    fn get(&self, owner: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;
    fn put(&self, owner: &str, key: &str, value: &[u8]) -> StoreResult<()>;
    fn delete(&self, owner: &str, key: &str) -> StoreResult<bool>;
    fn list_keys(&self, owner: &str, prefix: &str) -> StoreResult<Vec<String>>;
}

/// Which physical backend backs the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    FlatFile,
}

/// Storage facade: backend selection, forward migration, shared handle.
///
/// Mutation goes through a mutex-guarded backend, so writes to the same key
/// are serialized (last write wins) while callers on distinct keys simply
/// queue briefly. All public accessors run the per-owner migration check
/// first.
pub struct Store {
    backend: Mutex<Box<dyn StorageBackend>>,
    fallback: Option<FlatFileBackend>,
    kind: BackendKind,
    migrated: Mutex<HashSet<String>>,
}

static SHARED: OnceLock<Arc<Store>> = OnceLock::new();
static SHARED_INIT: Mutex<()> = Mutex::new(());

impl Store {
    /// Open at the platform default data directory, preferring SQLite
    pub fn open() -> StoreResult<Self> {
        Self::open_at(&Self::default_dir()?)
    }

    /// Open under a specific directory (for testing), preferring SQLite.
    ///
    /// If SQLite cannot be opened the store degrades to the flat-file
    /// backend with identical semantics.
    pub fn open_at(dir: &Path) -> StoreResult<Self> {
        match SqliteBackend::open_at(dir) {
            Ok(primary) => {
                let fallback = FlatFileBackend::open_at(&dir.join("kv"))?;
                Ok(Self {
                    backend: Mutex::new(Box::new(primary)),
                    fallback: Some(fallback),
                    kind: BackendKind::Sqlite,
                    migrated: Mutex::new(HashSet::new()),
                })
            }
            Err(e) => {
                log::warn!("SQLite unavailable ({}), using flat-file storage", e);
                Self::open_flatfile_at(dir)
            }
        }
    }

    /// Open with the flat-file backend as primary (sandboxed targets)
    pub fn open_flatfile_at(dir: &Path) -> StoreResult<Self> {
        let primary = FlatFileBackend::open_at(&dir.join("kv"))?;
        Ok(Self {
            backend: Mutex::new(Box::new(primary)),
            fallback: None,
            kind: BackendKind::FlatFile,
            migrated: Mutex::new(HashSet::new()),
        })
    }

    /// Process-wide shared handle with idempotent initialization.
    ///
    /// The first caller opens the physical store; concurrent and repeated
    /// calls are safe no-ops that return the same handle.
    pub fn shared() -> StoreResult<Arc<Store>> {
        if let Some(store) = SHARED.get() {
            return Ok(store.clone());
        }
        let _guard = SHARED_INIT.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(store) = SHARED.get() {
            return Ok(store.clone());
        }
        let store = Arc::new(Store::open()?);
        let _ = SHARED.set(store.clone());
        Ok(store)
    }

    /// Default data directory (`<platform data dir>/bazaarcache`)
    pub fn default_dir() -> StoreResult<PathBuf> {
        let base = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        Ok(base.join("bazaarcache"))
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn get(&self, owner: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let backend = self.lock_backend()?;
        self.ensure_migrated(&**backend, owner)?;
        backend.get(owner, key)
    }

    pub fn put(&self, owner: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let backend = self.lock_backend()?;
        self.ensure_migrated(&**backend, owner)?;
        backend.put(owner, key, value)
    }

    pub fn delete(&self, owner: &str, key: &str) -> StoreResult<bool> {
        let backend = self.lock_backend()?;
        self.ensure_migrated(&**backend, owner)?;
        backend.delete(owner, key)
    }

    pub fn list_keys(&self, owner: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let backend = self.lock_backend()?;
        self.ensure_migrated(&**backend, owner)?;
        let mut keys = backend.list_keys(owner, prefix)?;
        keys.retain(|k| k != MIGRATED_MARKER);
        Ok(keys)
    }

    fn lock_backend(&self) -> StoreResult<MutexGuard<'_, Box<dyn StorageBackend>>> {
        self.backend.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Copy an owner's data forward from the fallback store on first access.
    ///
    /// Runs only when the primary holds nothing for the owner; the fallback
    /// copy is left untouched as a durable backup, so it can restore state
    /// across logout/login cycles or a later backend switch.
    fn ensure_migrated(&self, backend: &dyn StorageBackend, owner: &str) -> StoreResult<()> {
        let Some(fallback) = &self.fallback else {
            return Ok(());
        };

        {
            let migrated = self.migrated.lock().map_err(|_| StoreError::Poisoned)?;
            if migrated.contains(owner) {
                return Ok(());
            }
        }

        if backend.get(owner, MIGRATED_MARKER)?.is_none() {
            let existing = backend.list_keys(owner, "")?;
            if existing.is_empty() {
                let backup_keys = fallback.list_keys(owner, "")?;
                if !backup_keys.is_empty() {
                    log::info!(
                        "Migrating {} record(s) for owner from flat-file backup",
                        backup_keys.len()
                    );
                    for key in &backup_keys {
                        if let Some(value) = fallback.get(owner, key)? {
                            backend.put(owner, key, &value)?;
                        }
                    }
                }
            }
            backend.put(owner, MIGRATED_MARKER, b"1")?;
        }

        self.migrated
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(owner.to_string());
        Ok(())
    }

    /// Direct access to the fallback backend, for backup-restore tooling
    pub fn backup_store(&self) -> Option<&FlatFileBackend> {
        self.fallback.as_ref()
    }
}
