use std::time::Duration;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::pod::ShelfPod;

pub async fn run(pod: Arc<ShelfPod>, token: CancellationToken) {
    debug!("expirer started");

    loop {
        if token.is_cancelled() {
            break;
        }

        match pod.expiry_queue.peek_first() {
            None => {
                tokio::select! {
                    _ = pod.expiry_queue.wait_for_change() => {}
                    _ = token.cancelled() => break,
                }
            }
            Some(head) => {
                let now = pod.clock.now_ms();
                if head.due_at_ms <= now {
                    if let Some(entry) = pod.expiry_queue.remove(&head.order.id) {
                        if !entry.order.state().is_terminal() {
                            pod.expire_order(&entry.order);
                        }
                    }
                } else {
                    let wait = Duration::from_millis((head.due_at_ms - now) as u64);
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = pod.expiry_queue.wait_for_change() => {}
                        _ = token.cancelled() => break,
                    }
                }
            }
        }
    }

    debug!("expirer stopped");
}
