//! bazaarcache - data-resilience layer for the Bazaar marketplace clients
//!
//! Everything a mobile client needs to stay correct and responsive when the
//! network isn't: a TTL- and capacity-bounded cache for list/detail
//! responses, one owner-partitioned storage interface over two physical
//! backends (SQLite where available, flat files in restricted sandboxes), a
//! typed error taxonomy with retry/re-auth flags, bounded exponential-backoff
//! retry, and an injectable connectivity gate for cache-only reads.
//!
//! The remote API, UI navigation and auth flows live elsewhere; this crate
//! only consumes HTTP status codes and JSON error envelopes, and hands back
//! payloads or typed errors.

pub mod cache;
pub mod cart;
pub mod error;
pub mod filters;
pub mod net;
pub mod storage;

pub use cache::{filter_fingerprint, CacheKey, CacheManager, CacheTtl, CachedFetcher, tables};
pub use cart::{CartItem, CartStore};
pub use error::{ApiError, ApiResult, StoreError, StoreResult};
pub use filters::FilterStore;
pub use net::{
    classify, run_with_retry, run_with_retry_cancellable, AlwaysOnline, CancelToken,
    ConnectivityObserver, ManualConnectivity, RetryPolicy,
};
pub use storage::{BackendKind, StorageBackend, Store};
