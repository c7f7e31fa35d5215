use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use crate::order::Order;

// one BTreeSet ordered by (expiry_at_ms, id) plus a HashMap index, so
// remove-by-id doesn't need a linear scan
#[derive(Clone)]
pub struct QueueEntry {
    pub order: Arc<Order>,
    pub expiry_at_ms: i64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.expiry_at_ms == other.expiry_at_ms && self.order.id == other.order.id
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expiry_at_ms
            .cmp(&other.expiry_at_ms)
            .then_with(|| self.order.id.cmp(&other.order.id))
    }
}

// admission itself is enforced upstream by the per-shelf semaphores
#[derive(Default)]
pub struct SharedQueue {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    ordered: BTreeSet<QueueEntry>,
    by_id: HashMap<String, QueueEntry>,
}

impl SharedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: Arc<Order>, expiry_at_ms: i64) {
        let entry = QueueEntry { order, expiry_at_ms };
        let mut inner = self.inner.lock().unwrap();
        inner.by_id.insert(entry.order.id.clone(), entry.clone());
        inner.ordered.insert(entry);
    }

    pub fn remove(&self, id: &str) -> Option<QueueEntry> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.by_id.remove(id)?;
        inner.ordered.remove(&entry);
        Some(entry)
    }

    pub fn pop_first(&self) -> Option<QueueEntry> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.ordered.pop_first()?;
        inner.by_id.remove(&entry.order.id);
        Some(entry)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().unwrap().by_id.contains_key(id)
    }

    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.inner.lock().unwrap().ordered.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
