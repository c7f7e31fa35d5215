use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::warn;

use crate::pod::AddResult;

// implementations must not block; offload real work to their own executor
pub trait ShelfObserver: Send + Sync {
    fn post_add_order(&self, result: &AddResult);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: DashMap<u64, Arc<dyn ShelfObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn ShelfObserver>) -> ObserverHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.insert(id, observer);
        ObserverHandle(id)
    }

    pub fn unregister(&self, handle: ObserverHandle) {
        self.observers.remove(&handle.0);
    }

    // weakly consistent: an observer added/removed mid-fan-out may or may
    // not be visited. a panicking observer is caught so it can't stop the
    // rest from being notified.
    pub fn notify_add(&self, result: &AddResult) {
        for entry in self.observers.iter() {
            let observer = entry.value().clone();
            let result = result.clone();
            if let Err(panic) =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    observer.post_add_order(&result)
                }))
            {
                warn!(?panic, "observer panicked during post_add_order");
            }
        }
    }
}
