use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use dashmap::DashMap;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ShelfPodConfig;
use crate::delay::BlockingPriorityQueue;
use crate::error::PodError;
use crate::observer::{ObserverHandle, ObserverRegistry, ShelfObserver};
use crate::order::{Order, OrderState, ShelfTemperature, Temperature};
use crate::queue::SharedQueue;
use crate::shelf::Shelf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpdateOp {
    Add,
    Move,
    Remove,
    Poll,
    Expire,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddResult {
    pub order_id: String,
    pub added: bool,
    pub state: OrderState,
    pub shelf: ShelfTemperature,
}

struct BackgroundActivities {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

pub struct ShelfPod {
    pub(crate) shelves: HashMap<ShelfTemperature, Shelf>,
    pub(crate) semaphores: HashMap<ShelfTemperature, Arc<Semaphore>>,
    pub(crate) queue: SharedQueue,
    // dropping an entry here is what returns a permit to its semaphore
    pub(crate) permits: DashMap<String, tokio::sync::OwnedSemaphorePermit>,
    pub(crate) observers: ObserverRegistry,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) update_log_tx: mpsc::UnboundedSender<(Arc<Order>, UpdateOp)>,
    update_log_rx: StdMutex<Option<mpsc::UnboundedReceiver<(Arc<Order>, UpdateOp)>>>,
    pub(crate) watch_queues: HashMap<Temperature, Arc<BlockingPriorityQueue>>,
    pub(crate) expiry_queue: Arc<BlockingPriorityQueue>,
    background: StdMutex<Option<BackgroundActivities>>,
}

impl ShelfPod {
    pub fn new(config: ShelfPodConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>, PodError> {
        let mut shelves = HashMap::new();
        let mut semaphores = HashMap::new();
        for shelf in &config.shelves {
            if shelves.contains_key(&shelf.temperature) {
                return Err(PodError::DuplicateShelf {
                    temperature: shelf.temperature,
                });
            }
            semaphores.insert(shelf.temperature, Arc::new(Semaphore::new(shelf.capacity)));
            shelves.insert(shelf.temperature, shelf.clone());
        }
        for required in [
            ShelfTemperature::Hot,
            ShelfTemperature::Cold,
            ShelfTemperature::Frozen,
            ShelfTemperature::Overflow,
        ] {
            if !shelves.contains_key(&required) {
                return Err(PodError::MissingShelf {
                    temperature: required,
                });
            }
        }

        let mut watch_queues = HashMap::new();
        for temp in [Temperature::Hot, Temperature::Cold, Temperature::Frozen] {
            watch_queues.insert(temp, Arc::new(BlockingPriorityQueue::new()));
        }

        let (update_log_tx, update_log_rx) = mpsc::unbounded_channel();

        Ok(Arc::new(Self {
            shelves,
            semaphores,
            queue: SharedQueue::new(),
            permits: DashMap::new(),
            observers: ObserverRegistry::new(),
            clock,
            update_log_tx,
            update_log_rx: StdMutex::new(Some(update_log_rx)),
            watch_queues,
            expiry_queue: Arc::new(BlockingPriorityQueue::new()),
            background: StdMutex::new(None),
        }))
    }

    pub fn get_shelves(&self) -> Vec<Shelf> {
        self.shelves.values().cloned().collect()
    }

    pub fn add_observer(&self, observer: Arc<dyn ShelfObserver>) -> ObserverHandle {
        self.observers.register(observer)
    }

    pub fn remove_observer(&self, handle: ObserverHandle) {
        self.observers.unregister(handle);
    }

    fn factor_for(&self, temperature: ShelfTemperature) -> f64 {
        self.shelves[&temperature].decay_rate_factor
    }

    // panics on an order not in a StoredIn* state; that's a programming error
    fn factor_for_state(&self, order: &Order) -> f64 {
        match order.state() {
            OrderState::StoredInRegular => self.factor_for(order.temperature.into()),
            OrderState::StoredInOverflow => self.factor_for(ShelfTemperature::Overflow),
            other => panic!(
                "{}",
                PodError::IllegalShelfQuery {
                    id: order.id.clone(),
                    state: other,
                }
            ),
        }
    }

    fn log_update(&self, order: Arc<Order>, op: UpdateOp) {
        let _ = self.update_log_tx.send((order, op));
    }

    // precondition: order.state() == Created
    pub fn add_order(&self, order: Arc<Order>) -> AddResult {
        let native_temp: ShelfTemperature = order.temperature.into();
        let native_factor = self.factor_for(native_temp);
        let now = self.clock.now_ms();

        if order.has_expired(now, native_factor) {
            order.compare_and_set(OrderState::Created, OrderState::CameExpired);
            debug!(order_id = %order.id, "order came expired before it could be shelved");
            return AddResult {
                order_id: order.id.clone(),
                added: false,
                state: OrderState::CameExpired,
                shelf: native_temp,
            };
        }

        if let Ok(permit) = self.semaphores[&native_temp].clone().try_acquire_owned() {
            if order.compare_and_set(OrderState::Created, OrderState::StoredInRegular) {
                self.permits.insert(order.id.clone(), permit);
                self.queue
                    .insert(order.clone(), order.expiry_at_ms(now, native_factor));
                self.log_update(order.clone(), UpdateOp::Add);
                let result = AddResult {
                    order_id: order.id.clone(),
                    added: true,
                    state: OrderState::StoredInRegular,
                    shelf: native_temp,
                };
                info!(order_id = %result.order_id, shelf = ?native_temp, "order stored");
                self.observers.notify_add(&result);
                return result;
            }
            // CAS lost, release the permit and fall through to overflow
            drop(permit);
        }

        let overflow_factor = self.factor_for(ShelfTemperature::Overflow);
        if order.has_expired(now, overflow_factor) {
            order.compare_and_set(OrderState::Created, OrderState::CameExpired);
            return AddResult {
                order_id: order.id.clone(),
                added: false,
                state: OrderState::CameExpired,
                shelf: ShelfTemperature::Overflow,
            };
        }

        match self.semaphores[&ShelfTemperature::Overflow]
            .clone()
            .try_acquire_owned()
        {
            Ok(permit) => {
                if order.compare_and_set(OrderState::Created, OrderState::StoredInOverflow) {
                    self.permits.insert(order.id.clone(), permit);
                    self.queue
                        .insert(order.clone(), order.expiry_at_ms(now, overflow_factor));
                    self.log_update(order.clone(), UpdateOp::Add);
                    let result = AddResult {
                        order_id: order.id.clone(),
                        added: true,
                        state: OrderState::StoredInOverflow,
                        shelf: ShelfTemperature::Overflow,
                    };
                    info!(order_id = %result.order_id, "order stored in overflow");
                    self.observers.notify_add(&result);
                    result
                } else {
                    drop(permit);
                    AddResult {
                        order_id: order.id.clone(),
                        added: false,
                        state: order.state(),
                        shelf: ShelfTemperature::Overflow,
                    }
                }
            }
            Err(_) => {
                order.compare_and_set(OrderState::Created, OrderState::ExpiredOnNoSpace);
                warn!(order_id = %order.id, "no space on native shelf or overflow");
                AddResult {
                    order_id: order.id.clone(),
                    added: false,
                    state: OrderState::ExpiredOnNoSpace,
                    shelf: ShelfTemperature::Overflow,
                }
            }
        }
    }

    // removes order from the shared queue by id, releasing its permit
    pub fn remove_order(&self, order: &Arc<Order>) -> bool {
        if self.queue.remove(&order.id).is_some() {
            self.permits.remove(&order.id);
            self.log_update(order.clone(), UpdateOp::Remove);
            true
        } else {
            false
        }
    }

    // no-op if the order wasn't queued
    pub fn expire_order(&self, order: &Arc<Order>) -> bool {
        if self.queue.remove(&order.id).is_none() {
            return false;
        }
        let terminal = match order.state() {
            OrderState::StoredInRegular => OrderState::ExpiredInRegular,
            OrderState::StoredInOverflow => OrderState::ExpiredInOverflow,
            other => panic!(
                "{}",
                PodError::IllegalShelfQuery {
                    id: order.id.clone(),
                    state: other,
                }
            ),
        };
        order.set_state(terminal);
        self.permits.remove(&order.id);
        self.log_update(order.clone(), UpdateOp::Expire);
        true
    }

    // pops the soonest-expiry head, re-checking expiry since time may have
    // passed between enqueue and dequeue
    pub fn poll_order(&self) -> Option<Arc<Order>> {
        loop {
            let entry = self.queue.pop_first()?;
            self.permits.remove(&entry.order.id);
            let factor = self.factor_for_state(&entry.order);
            let now = self.clock.now_ms();
            if entry.order.has_expired(now, factor) {
                let terminal = match entry.order.state() {
                    OrderState::StoredInRegular => OrderState::ExpiredInRegular,
                    OrderState::StoredInOverflow => OrderState::ExpiredInOverflow,
                    other => panic!(
                        "{}",
                        PodError::IllegalShelfQuery {
                            id: entry.order.id.clone(),
                            state: other,
                        }
                    ),
                };
                entry.order.set_state(terminal);
                self.log_update(entry.order.clone(), UpdateOp::Expire);
                continue;
            }
            entry.order.set_state(OrderState::PickedUpForDelivery);
            self.log_update(entry.order.clone(), UpdateOp::Poll);
            return Some(entry.order);
        }
    }

    // blocking, only ever called from a mover task
    // precondition: order.state() == StoredInOverflow
    pub(crate) async fn move_order(&self, order: Arc<Order>) {
        let native_temp: ShelfTemperature = order.temperature.into();
        let sem = self.semaphores[&native_temp].clone();
        let permit = match sem.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return, // semaphore closed during shutdown
        };

        if !self.remove_order(&order) {
            // already polled or expired by someone else
            drop(permit);
            return;
        }

        if order.compare_and_set(OrderState::StoredInOverflow, OrderState::StoredInRegular) {
            let now = self.clock.now_ms();
            order.set_time_spent_on_overflow_ms(now - order.created_at_ms);
            self.permits.insert(order.id.clone(), permit);
            let factor = self.factor_for(native_temp);
            self.queue
                .insert(order.clone(), order.expiry_at_ms(now, factor));
            self.log_update(order.clone(), UpdateOp::Move);
            info!(order_id = %order.id, shelf = ?native_temp, "order promoted out of overflow");
        } else {
            drop(permit);
        }
    }

    pub fn list_orders(&self) -> Vec<crate::order::OrderSnapshot> {
        // queue.snapshot() is already ordered by (expiry_at_ms, id); filtering
        // it preserves that order
        self.queue
            .snapshot()
            .into_iter()
            .map(|entry| entry.order.deep_copy())
            .filter(|o| {
                matches!(
                    o.state,
                    OrderState::StoredInRegular | OrderState::StoredInOverflow
                )
            })
            .collect()
    }

    // one mover per regular temperature, one expirer, one update dispatcher
    // idempotent: a no-op if already running
    pub fn start_background_activities(self: &Arc<Self>) {
        let mut background = self.background.lock().unwrap();
        if background.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let mut handles = Vec::new();

        let rx = self
            .update_log_rx
            .lock()
            .unwrap()
            .take()
            .expect("update log receiver already taken");
        handles.push(tokio::spawn(crate::workers::dispatcher::run(
            self.clone(),
            rx,
            token.clone(),
        )));

        for temp in [Temperature::Hot, Temperature::Cold, Temperature::Frozen] {
            handles.push(tokio::spawn(crate::workers::mover::run(
                self.clone(),
                temp,
                token.clone(),
            )));
        }

        handles.push(tokio::spawn(crate::workers::expirer::run(
            self.clone(),
            token.clone(),
        )));

        info!("background activities started");
        *background = Some(BackgroundActivities { token, handles });
    }

    pub async fn stop_background_activities(&self) {
        let activities = self.background.lock().unwrap().take();
        let Some(activities) = activities else {
            return;
        };
        activities.token.cancel();
        for handle in activities.handles {
            let _ = handle.await;
        }
        info!("background activities stopped");
    }
}
