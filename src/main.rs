//! # Kitchen Simulation
//!
//! Replays an orders file (or a batch of synthetic orders) against a running
//! [`KitchenSystem`] at a fixed rate, waits for every courier to finish, and
//! logs the final stats.
//!
//! Every flag can also be set through a `KITCHEN_*` environment variable.

use clap::Parser;
use kitchen_shelves::config::ServiceConfig;
use kitchen_shelves::lifecycle::{setup_tracing, KitchenSystem};
use kitchen_shelves::model::{Order, ShelfClass};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Kitchen simulation - perishable orders on bounded shelves
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding an array of orders
    #[arg(long, env = "KITCHEN_ORDERS")]
    orders: Option<PathBuf>,

    /// Number of synthetic orders to generate when no orders file is given
    #[arg(long, env = "KITCHEN_GENERATE", default_value = "100")]
    generate: usize,

    /// Orders submitted per second
    #[arg(long, env = "KITCHEN_RATE", default_value = "2.0")]
    rate: f64,

    /// Processing workers (default: 2 x available cores)
    #[arg(long, env = "KITCHEN_PROCESSING_WORKERS")]
    processing_workers: Option<usize>,

    /// Dispatch workers (default: 2 x available cores)
    #[arg(long, env = "KITCHEN_DISPATCH_WORKERS")]
    dispatch_workers: Option<usize>,

    /// Reclamation interval in milliseconds
    #[arg(long, env = "KITCHEN_RECLAMATION_INTERVAL_MS", default_value = "1000")]
    reclamation_interval_ms: u64,

    /// Shortest courier delay in seconds
    #[arg(long, env = "KITCHEN_DISPATCH_DELAY_LOW", default_value = "2")]
    dispatch_delay_low: u64,

    /// Longest courier delay in seconds
    #[arg(long, env = "KITCHEN_DISPATCH_DELAY_HIGH", default_value = "6")]
    dispatch_delay_high: u64,

    /// Stats log interval in seconds
    #[arg(long, env = "KITCHEN_STATS_INTERVAL", default_value = "60")]
    stats_interval: u64,

    /// Bound on each intake queue (default: unbounded)
    #[arg(long, env = "KITCHEN_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// Extra pickup attempts after a miss
    #[arg(long, env = "KITCHEN_DISPATCH_RETRIES", default_value = "0")]
    dispatch_retries: u32,
}

impl Args {
    fn service_config(&self) -> ServiceConfig {
        let defaults = ServiceConfig::default();
        ServiceConfig {
            processing_workers: self.processing_workers.unwrap_or(defaults.processing_workers),
            dispatch_workers: self.dispatch_workers.unwrap_or(defaults.dispatch_workers),
            reclamation_interval: Duration::from_millis(self.reclamation_interval_ms),
            dispatch_delay_low: Duration::from_secs(self.dispatch_delay_low),
            dispatch_delay_high: Duration::from_secs(self.dispatch_delay_high),
            stats_interval: Duration::from_secs(self.stats_interval),
            queue_capacity: self.queue_capacity,
            dispatch_retries: self.dispatch_retries,
        }
    }
}

// =============================================================================
// Order Sources
// =============================================================================

async fn load_orders(path: &Path) -> Result<Vec<String>, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let orders: Vec<serde_json::Value> =
        serde_json::from_str(&text).map_err(|e| format!("{} is not a JSON array: {}", path.display(), e))?;
    Ok(orders.iter().map(serde_json::Value::to_string).collect())
}

fn generate_orders(count: usize) -> Result<Vec<String>, String> {
    const NAMES: [&str; 8] = [
        "Banana Split", "Cheese Pizza", "Pad Thai", "Acai Bowl",
        "Beef Stew", "Kale Salad", "Mint Ice Cream", "Cobb Salad",
    ];
    const CLASSES: [ShelfClass; 3] = [ShelfClass::Hot, ShelfClass::Cold, ShelfClass::Frozen];

    let mut rng = rand::rng();
    (0..count)
        .map(|i| {
            let order = Order::new(
                format!("order-{i}"),
                NAMES[rng.random_range(0..NAMES.len())],
                CLASSES[rng.random_range(0..CLASSES.len())],
                rng.random_range(30..=300),
                rng.random_range(0.1..=0.9),
            );
            order.to_json().map_err(|e| e.to_string())
        })
        .collect()
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();
    setup_tracing();

    if !(args.rate.is_finite() && args.rate > 0.0) {
        return Err(format!("rate must be a positive number, got {}", args.rate));
    }

    let orders = match &args.orders {
        Some(path) => load_orders(path).await?,
        None => generate_orders(args.generate)?,
    };
    info!(count = orders.len(), rate = args.rate, "Starting simulation");

    let system = KitchenSystem::start(args.service_config()).map_err(|e| e.to_string())?;

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / args.rate));
    let mut accepted = 0;
    for json in &orders {
        ticker.tick().await;
        match system.intake.submit_json(json) {
            Ok(outcome) if outcome.accepted() => accepted += 1,
            Ok(outcome) => warn!(?outcome, "Order not accepted by both queues"),
            Err(e) => warn!(error = %e, "Skipping undecodable order"),
        }
    }

    info!(accepted, "All orders submitted; waiting for couriers");
    system.wait_until_dispatched(accepted).await;

    info!(stats = %system.stats.snapshot(), "Simulation finished");
    system.shutdown().await.map_err(|e| e.to_string())?;

    Ok(())
}
