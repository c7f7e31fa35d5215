use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::order::Temperature;
use crate::pod::ShelfPod;

pub async fn run(pod: Arc<ShelfPod>, temperature: Temperature, token: CancellationToken) {
    let watch_queue = pod.watch_queues[&temperature].clone();
    debug!(?temperature, "mover started");

    loop {
        if token.is_cancelled() {
            break;
        }

        match watch_queue.pop_first() {
            Some(entry) => {
                if entry.order.state().is_terminal() {
                    continue;
                }
                tokio::select! {
                    _ = pod.move_order(entry.order) => {}
                    _ = token.cancelled() => break,
                }
            }
            None => {
                tokio::select! {
                    _ = watch_queue.wait_for_change() => {}
                    _ = token.cancelled() => break,
                }
            }
        }
    }

    debug!(?temperature, "mover stopped");
}
