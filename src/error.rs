//! Error types for the Bazaar data-resilience layer

use thiserror::Error;

/// Result alias for API-facing operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Result alias for storage-layer operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Typed API error taxonomy.
///
/// Every variant carries a human-readable message extracted from the server's
/// JSON error envelope (or a per-status fallback). Callers branch on the
/// [`is_retryable`](ApiError::is_retryable),
/// [`requires_reauth`](ApiError::requires_reauth) and
/// [`is_validation_error`](ApiError::is_validation_error) flags.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Timeout(String),
}

impl ApiError {
    /// HTTP status code, if this error originated from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(_) => Some(400),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(_) | ApiError::Timeout(_) => None,
        }
    }

    /// Whether another retry attempt may succeed.
    ///
    /// Server errors are retryable only in the 5xx range; transport-level
    /// failures and client timeouts are always worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Server { status, .. } => *status >= 500,
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Whether the caller must force logout / re-authentication
    pub fn requires_reauth(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Whether this is a field-level validation failure the UI should surface
    pub fn is_validation_error(&self) -> bool {
        matches!(self, ApiError::BadRequest(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to server".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Storage-layer errors.
///
/// These never escape a cache read path: the cache is a best-effort
/// optimization, so faults are logged and degrade to a miss. Partitioned
/// record stores (cart, filters) do propagate them, since those records are
/// the source of truth.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("could not determine platform data directory")]
    NoDataDir,

    #[error("storage lock poisoned")]
    Poisoned,
}
