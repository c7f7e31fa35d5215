use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::info;

use shelfpod::ShelfPod;

// waits a random delay in [min, max], then polls once
pub async fn run_courier(pod: Arc<ShelfPod>, min: Duration, max: Duration) {
    let delay = {
        let mut rng = rand::rng();
        let min_secs = min.as_secs_f64();
        let max_secs = max.as_secs_f64().max(min_secs);
        Duration::from_secs_f64(rng.random_range(min_secs..=max_secs))
    };
    tokio::time::sleep(delay).await;

    match pod.poll_order() {
        Some(order) => info!(order_id = %order.id, "courier picked up order"),
        None => info!("courier arrived to an empty pod"),
    }
}
