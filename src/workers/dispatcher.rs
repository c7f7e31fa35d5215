use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::order::{Order, OrderState, ShelfTemperature};
use crate::pod::{ShelfPod, UpdateOp};

// single consumer of the update log, keeps the expiry queue and mover
// watch queues in sync after each mutation
pub async fn run(
    pod: Arc<ShelfPod>,
    mut log_rx: mpsc::UnboundedReceiver<(Arc<Order>, UpdateOp)>,
    token: CancellationToken,
) {
    debug!("update dispatcher started");

    loop {
        let received = tokio::select! {
            received = log_rx.recv() => received,
            _ = token.cancelled() => None,
        };
        let Some((order, op)) = received else {
            break;
        };

        match op {
            UpdateOp::Add => {
                let factor = current_factor(&pod, &order);
                let now = pod.clock.now_ms();
                pod.expiry_queue
                    .insert(order.clone(), order.expiry_at_ms(now, factor));
                if order.state() == OrderState::StoredInOverflow {
                    if let Some(watch_queue) = pod.watch_queues.get(&order.temperature) {
                        watch_queue.insert(order.clone(), order.expiry_at_ms(now, factor));
                    }
                }
            }
            UpdateOp::Move => {
                let factor = current_factor(&pod, &order);
                let now = pod.clock.now_ms();
                pod.expiry_queue
                    .insert(order.clone(), order.expiry_at_ms(now, factor));
                // mover already removed this order from its own watch queue
            }
            UpdateOp::Remove | UpdateOp::Poll => {
                pod.expiry_queue.remove(&order.id);
                if let Some(watch_queue) = pod.watch_queues.get(&order.temperature) {
                    watch_queue.remove(&order.id);
                }
            }
            UpdateOp::Expire => {
                // expiry queue entry drains naturally, expirer removed it itself
                if let Some(watch_queue) = pod.watch_queues.get(&order.temperature) {
                    watch_queue.remove(&order.id);
                }
            }
        }
    }

    debug!("update dispatcher stopped");
}

fn current_factor(pod: &ShelfPod, order: &Order) -> f64 {
    let temperature = match order.state() {
        OrderState::StoredInOverflow => ShelfTemperature::Overflow,
        _ => order.temperature.into(),
    };
    pod.shelves[&temperature].decay_rate_factor
}
