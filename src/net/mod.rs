//! Network resilience: error classification, bounded retry, connectivity gate

pub mod classify;
pub mod connectivity;
pub mod retry;

pub use classify::classify;
pub use connectivity::{AlwaysOnline, ConnectivityObserver, ManualConnectivity};
pub use retry::{run_with_retry, run_with_retry_cancellable, CancelToken, RetryPolicy};
