//! Persisted UI filter selections
//!
//! Opaque serialized blobs keyed by screen/context identifier, last write
//! wins. The blob format belongs to the UI layer; this store never
//! interprets it.

use std::sync::Arc;

use crate::cache::key::escape;
use crate::cache::tables;
use crate::error::StoreResult;
use crate::storage::Store;

/// Per-context filter state store
pub struct FilterStore {
    store: Arc<Store>,
}

impl FilterStore {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn context_key(context: &str) -> String {
        format!("{}/{}", tables::FILTERS, escape(context))
    }

    /// Save the filter blob for a screen context (last write wins)
    pub async fn save(&self, owner: &str, context: &str, blob: &str) -> StoreResult<()> {
        self.store
            .put(owner, &Self::context_key(context), blob.as_bytes())
    }

    /// Load the filter blob saved for a screen context
    pub async fn load(&self, owner: &str, context: &str) -> StoreResult<Option<String>> {
        let bytes = self.store.get(owner, &Self::context_key(context))?;
        Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
    }

    /// Forget the saved filters for a screen context
    pub async fn clear(&self, owner: &str, context: &str) -> StoreResult<bool> {
        self.store.delete(owner, &Self::context_key(context))
    }
}
