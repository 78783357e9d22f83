//! # Request Deduplication Module
//!
//! Per-key single-flight: while a fetch for a key is in progress, further
//! callers for the same key await that fetch instead of starting their own.
//!
//! The first caller (the leader) registers a shared future; followers clone
//! it. The registration is removed when the leader finishes or is dropped, so
//! a cancelled leader never leaves a stale result behind. Followers that are
//! already waiting keep driving the shared future to completion.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

type InFlight<T> = (u64, Shared<BoxFuture<'static, T>>);

/// Coalesces concurrent work per key.
pub struct SingleFlight<T: Clone> {
    in_flight: Arc<Mutex<HashMap<String, InFlight<T>>>>,
    next_id: AtomicU64,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

/// Unregisters the leader's flight when dropped, unless a newer flight has
/// replaced it.
struct LeaderGuard<T: Clone> {
    in_flight: Arc<Mutex<HashMap<String, InFlight<T>>>>,
    key: String,
    id: u64,
}

impl<T: Clone> Drop for LeaderGuard<T> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(&self.key).is_some_and(|(id, _)| *id == self.id) {
            in_flight.remove(&self.key);
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join the flight already running for it.
    ///
    /// Returns the result and whether this caller led the flight.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> (T, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (flight, guard) = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(key) {
                Some((_, flight)) => (flight.clone(), None),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let flight = work().boxed().shared();
                    in_flight.insert(key.to_string(), (id, flight.clone()));
                    let guard = LeaderGuard {
                        in_flight: self.in_flight.clone(),
                        key: key.to_string(),
                        id,
                    };
                    (flight, Some(guard))
                }
            }
        };

        let leader = guard.is_some();
        if !leader {
            debug!("Joining in-flight fetch for key: {}", key);
        }

        let result = flight.await;
        drop(guard);
        (result, leader)
    }

    /// Number of keys with a fetch currently in progress.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}
