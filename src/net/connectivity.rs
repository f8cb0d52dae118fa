//! Connectivity gate used to short-circuit to cache-only reads
//!
//! The observer is injected rather than hardcoded so platform shims can feed
//! a real reachability signal; [`AlwaysOnline`] is the optimistic default.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

/// Online/offline signal source.
#[async_trait]
pub trait ConnectivityObserver: Send + Sync {
    /// Whether the device is currently offline
    fn is_offline(&self) -> bool;

    /// Wait until the network comes back, up to `timeout`.
    ///
    /// Returns `true` if online when the wait ends.
    async fn wait_for_network(&self, timeout: Duration) -> bool;
}

/// Optimistic default: always reports online.
///
/// Substitutable with a real signal source; callers that queue writes for
/// replay should inject one.
pub struct AlwaysOnline;

#[async_trait]
impl ConnectivityObserver for AlwaysOnline {
    fn is_offline(&self) -> bool {
        false
    }

    async fn wait_for_network(&self, _timeout: Duration) -> bool {
        true
    }
}

/// Connectivity signal driven by explicit `set_online` calls.
///
/// Backs platform reachability callbacks and tests.
pub struct ManualConnectivity {
    online: AtomicBool,
    notify: Notify,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            notify: Notify::new(),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if online {
            self.notify.notify_waiters();
        }
    }
}

#[async_trait]
impl ConnectivityObserver for ManualConnectivity {
    fn is_offline(&self) -> bool {
        !self.online.load(Ordering::SeqCst)
    }

    async fn wait_for_network(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                // Register before re-checking to avoid missing a wakeup
                let notified = self.notify.notified();
                if !self.is_offline() {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}
