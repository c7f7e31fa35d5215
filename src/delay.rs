use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::order::Order;

#[derive(Clone)]
pub struct DelayEntry {
    pub order: Arc<Order>,
    pub due_at_ms: i64,
}

impl PartialEq for DelayEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due_at_ms == other.due_at_ms && self.order.id == other.order.id
    }
}
impl Eq for DelayEntry {}

impl PartialOrd for DelayEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_at_ms
            .cmp(&other.due_at_ms)
            .then_with(|| self.order.id.cmp(&other.order.id))
    }
}

#[derive(Default)]
struct Inner {
    ordered: BTreeSet<DelayEntry>,
    by_id: HashMap<String, DelayEntry>,
}

// shared by the expirer's delay queue and the mover watch queues: one
// waiter per queue, so notify_one's stored permit is enough to survive
// an insert that lands between a caller's empty check and its next
// wait_for_change (no lost wakeup on a quiescent queue).
pub struct BlockingPriorityQueue {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl Default for BlockingPriorityQueue {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
        }
    }
}

impl BlockingPriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // inserts, or replaces by id, and wakes the waiter
    pub fn insert(&self, order: Arc<Order>, due_at_ms: i64) {
        let entry = DelayEntry { order, due_at_ms };
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(old) = inner.by_id.remove(&entry.order.id) {
                inner.ordered.remove(&old);
            }
            inner.by_id.insert(entry.order.id.clone(), entry.clone());
            inner.ordered.insert(entry);
        }
        self.notify.notify_one();
    }

    pub fn remove(&self, id: &str) -> Option<DelayEntry> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.by_id.remove(id)?;
        inner.ordered.remove(&entry);
        Some(entry)
    }

    pub fn peek_first(&self) -> Option<DelayEntry> {
        self.inner.lock().unwrap().ordered.first().cloned()
    }

    // unconditional pop, used by mover watch queues (no time gating)
    pub fn pop_first(&self) -> Option<DelayEntry> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.ordered.pop_first()?;
        inner.by_id.remove(&entry.order.id);
        Some(entry)
    }

    // spurious wakeups are fine, callers always re-check state after waking
    pub async fn wait_for_change(&self) {
        self.notify.notified().await;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
