use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};
use tracing::info;

use shelfpod::{Order, OrderSpec, ShelfPod};

pub fn load_orders(path: &Path) -> Result<Vec<OrderSpec>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading orders file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing orders file {}", path.display()))
}

// submits each spec to pod at a Poisson process with mean rate orders_per_sec
pub async fn run_poisson(
    pod: Arc<ShelfPod>,
    specs: Vec<OrderSpec>,
    orders_per_sec: f64,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let inter_arrival = Exp::new(orders_per_sec).expect("orders_per_sec must be positive");

    for spec in specs {
        let gap_secs = inter_arrival.sample(&mut rng);
        tokio::time::sleep(Duration::from_secs_f64(gap_secs)).await;

        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64;
        let order = Arc::new(Order::new(
            spec.id,
            spec.name,
            spec.temp,
            spec.shelf_life_secs,
            spec.decay_rate,
            now_ms,
        ));
        let result = pod.add_order(order);
        info!(order_id = %result.order_id, added = result.added, state = ?result.state, "submitted order");
    }
}
