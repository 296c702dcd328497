//! # Single-Flight Computation Map
//!
//! De-duplicates concurrent computations per cache key: the first caller for
//! a key starts the computation, every concurrent caller for the same key
//! awaits the shared outcome instead of starting its own. Success and
//! failure are both broadcast to all waiters; failures are never cached
//! here, each waiter decides what to do with the propagated error.
//!
//! The computation runs in a detached task, so cancelling one waiter (for
//! example, a client dropping its HTTP request) never cancels the shared
//! computation that other waiters are still awaiting.
//!
//! Keys for different credentials are independent: there is no ordering or
//! de-duplication across distinct keys.

use crate::core::error::{IdentityError, IdentityResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

/// Per-key in-flight computation registry.
pub struct SingleFlight<T> {
    inflight: Arc<Mutex<HashMap<String, broadcast::Sender<IdentityResult<T>>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Clone + Send + 'static> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `compute` for `key`, or attach to the computation already in
    /// flight for that key.
    ///
    /// The future passed in must perform any cache write it wants *before*
    /// resolving, because the in-flight handle is discarded the moment the
    /// result is ready and a later caller would otherwise recompute.
    pub async fn run<F>(&self, key: &str, compute: F) -> IdentityResult<T>
    where
        F: std::future::Future<Output = IdentityResult<T>> + Send + 'static,
    {
        let mut rx = {
            let mut inflight = self.inflight.lock().await;

            if let Some(tx) = inflight.get(key) {
                debug!(key, "attaching to in-flight computation");
                tx.subscribe()
            } else {
                let (tx, rx) = broadcast::channel(1);
                inflight.insert(key.to_string(), tx.clone());

                let registry = self.inflight.clone();
                let owned_key = key.to_string();

                // Detached: survives cancellation of any individual waiter.
                tokio::spawn(async move {
                    let result = compute.await;
                    registry.lock().await.remove(&owned_key);
                    // Waiters may all be gone; that is not an error.
                    let _ = tx.send(result);
                });

                rx
            }
        };

        rx.recv()
            .await
            .map_err(|_| IdentityError::cache("in-flight computation aborted"))?
    }

    /// Number of computations currently in flight.
    pub async fn len(&self) -> usize {
        self.inflight.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inflight.lock().await.is_empty()
    }
}
