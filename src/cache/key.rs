//! Structured composite cache keys
//!
//! A key is resource type + optional resource id + optional page + optional
//! filter fingerprint, serialized deterministically. Segments are escaped so
//! a delimiter inside a value can never collide with another key, and filter
//! parameters are hashed (sorted first) so equivalent filters always map to
//! the same fingerprint regardless of argument order.

use sha2::{Digest, Sha256};

/// Composite cache key for list/detail resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    resource: String,
    id: Option<String>,
    filter: Option<String>,
    page: Option<u32>,
}

impl CacheKey {
    /// Key for a resource type (list views add filter/page, detail views add id)
    pub fn resource(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            id: None,
            filter: None,
            page: None,
        }
    }

    /// Detail key for a single record
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Attach a filter fingerprint computed from the given parameters
    pub fn with_filter(mut self, params: &[(&str, &str)]) -> Self {
        self.filter = Some(filter_fingerprint(params));
        self
    }

    /// Attach a precomputed filter fingerprint
    pub fn with_fingerprint(mut self, fingerprint: &str) -> Self {
        self.filter = Some(fingerprint.to_string());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Deterministic serialized form.
    ///
    /// Tagged segments joined by `/`; missing segments are omitted, so
    /// presence/absence is always unambiguous.
    pub fn encode(&self) -> String {
        let mut segments = vec![format!("r={}", escape(&self.resource))];
        if let Some(id) = &self.id {
            segments.push(format!("i={}", escape(id)));
        }
        if let Some(filter) = &self.filter {
            segments.push(format!("f={}", filter));
        }
        if let Some(page) = self.page {
            segments.push(format!("p={}", page));
        }
        segments.join("/")
    }

    /// Prefix matching every cached view of this resource type.
    ///
    /// Used to invalidate all list pages (across filters) after a mutation.
    pub fn resource_prefix(resource: &str) -> String {
        format!("r={}/", escape(resource))
    }

    /// Prefix matching every page cached under this key's filter
    pub fn filter_prefix(&self) -> String {
        match &self.filter {
            Some(filter) => format!("r={}/f={}/", escape(&self.resource), filter),
            None => Self::resource_prefix(&self.resource),
        }
    }
}

/// SHA-256 fingerprint of sorted filter parameters.
///
/// Parameter order never changes the fingerprint.
pub fn filter_fingerprint(params: &[(&str, &str)]) -> String {
    let mut hasher = Sha256::new();

    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    for (k, v) in sorted {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{:x}", hasher.finalize())
}

/// Escape `/` and the escape character itself within a segment
pub(crate) fn escape(segment: &str) -> String {
    segment.replace('%', "%25").replace('/', "%2F")
}
