use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod courier;
mod producer;

use shelfpod::{ShelfPod, ShelfPodConfig, SystemClock};

#[derive(Parser)]
struct Args {
    #[arg(long, help = "Path to a shelf configuration JSON file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Path to a JSON file of orders to submit")]
    orders_file: PathBuf,

    #[arg(long, default_value = "5", help = "Mean order-submission rate, per second")]
    rate: f64,

    #[arg(long, default_value = "0", help = "Poisson arrival seed (0 = random)")]
    seed: u64,

    #[arg(long, default_value = "4", help = "Minimum courier pickup delay, seconds")]
    min: u64,

    #[arg(long, default_value = "8", help = "Maximum courier pickup delay, seconds")]
    max: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::try_parse()?;

    let shelf_config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            ShelfPodConfig::from_json_str(&raw)?
        }
        None => ShelfPodConfig::default(),
    };

    let pod = ShelfPod::new(shelf_config, Arc::new(SystemClock))?;
    pod.start_background_activities();

    let specs = producer::load_orders(&args.orders_file)?;
    let seed = if args.seed == 0 {
        rand::random()
    } else {
        args.seed
    };

    let min = Duration::from_secs(args.min);
    let max = Duration::from_secs(args.max);

    let mut courier_handles = Vec::with_capacity(specs.len());
    for _ in 0..specs.len() {
        let pod = pod.clone();
        courier_handles.push(tokio::spawn(courier::run_courier(pod, min, max)));
    }

    producer::run_poisson(pod.clone(), specs, args.rate, seed).await;

    // Give couriers time to finish their scheduled delays before shutting
    // the background workers down.
    tokio::time::sleep(Duration::from_secs_f64(1.0 / args.rate + max.as_secs_f64())).await;
    for handle in courier_handles {
        let _ = handle.await;
    }

    pod.stop_background_activities().await;

    for snapshot in pod.list_orders() {
        println!("{}: {:?}", snapshot.id, snapshot.state);
    }

    Ok(())
}
