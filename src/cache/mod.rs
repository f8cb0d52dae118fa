//! Local cache for API responses
//!
//! TTL- and capacity-bounded, built on the storage abstraction with
//! pagination/filter-aware composite keys. Designed to keep list and detail
//! screens responsive offline and to cut redundant API calls.

pub mod fetch;
pub mod key;
pub mod manager;

use std::time::Duration;

/// Logical table names in persistent storage
pub mod tables {
    /// Single-resource registration cache
    pub const REGISTRATIONS: &str = "registrations";
    /// Admin review lists, unique per filter key + page
    pub const ADMIN_REGISTRATIONS: &str = "admin_registrations";
    /// Per-context UI filter blobs
    pub const FILTERS: &str = "filters";
    /// Owner-partitioned cart line items
    pub const CART_ITEMS: &str = "cart_items";
}

/// Cache TTL configuration per data type
pub struct CacheTtl;

impl CacheTtl {
    /// Own registration detail - changes on review decisions
    pub const REGISTRATION_DETAIL: Duration = Duration::from_secs(10 * 60); // 10 min

    /// Admin review lists - pending queues move quickly
    pub const ADMIN_LIST: Duration = Duration::from_secs(5 * 60); // 5 min

    /// Reference data (categories, region lists)
    pub const REFERENCE: Duration = Duration::from_secs(60 * 60); // 1 hr
}

// Re-export main types
pub use fetch::CachedFetcher;
pub use key::{filter_fingerprint, CacheKey};
pub use manager::{CacheManager, DEFAULT_CAPACITY};
