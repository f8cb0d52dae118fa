//! Owner-partitioned cart line items
//!
//! Cart records are the source of truth, not a cache: they survive process
//! restarts and owner logout. On logout nothing is deleted; on login the
//! partition is found again by the owner id and rehydrated. Repeated adds of
//! the same product merge into one line item by accumulating quantity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::key::escape;
use crate::cache::tables;
use crate::error::StoreResult;
use crate::storage::Store;

/// One cart line item, unique per (owner, product)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub title: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

/// Persistent cart store over the storage abstraction
pub struct CartStore {
    store: Arc<Store>,
}

impl CartStore {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn item_key(product_id: &str) -> String {
        format!("{}/{}", tables::CART_ITEMS, escape(product_id))
    }

    fn prefix() -> String {
        format!("{}/", tables::CART_ITEMS)
    }

    /// Add an item, merging quantity into any existing line for the product.
    ///
    /// Title and price follow the newest add so stale listings self-correct.
    /// Returns the stored line item.
    pub async fn add(&self, owner: &str, item: CartItem) -> StoreResult<CartItem> {
        let key = Self::item_key(&item.product_id);
        let merged = match self.store.get(owner, &key)? {
            Some(bytes) => {
                let existing: CartItem = serde_json::from_slice(&bytes)?;
                CartItem {
                    quantity: existing.quantity.saturating_add(item.quantity),
                    ..item
                }
            }
            None => item,
        };
        self.store.put(owner, &key, &serde_json::to_vec(&merged)?)?;
        Ok(merged)
    }

    /// Remove the line item for a product; returns whether one existed
    pub async fn remove(&self, owner: &str, product_id: &str) -> StoreResult<bool> {
        self.store.delete(owner, &Self::item_key(product_id))
    }

    /// Remove every line item for the owner; returns the count removed
    pub async fn clear(&self, owner: &str) -> StoreResult<usize> {
        let keys = self.store.list_keys(owner, &Self::prefix())?;
        let mut removed = 0;
        for key in keys {
            if self.store.delete(owner, &key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// All line items for the owner, ordered by product id
    pub async fn list(&self, owner: &str) -> StoreResult<Vec<CartItem>> {
        let keys = self.store.list_keys(owner, &Self::prefix())?;
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.store.get(owner, &key)? {
                items.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(items)
    }
}
