//! Queue worker binary
//!
//! Consumes verification jobs from the durable queue and drives the
//! workflow engine. Run as many of these as the queue can feed; within a
//! process, `ARQ_MAX_WORKERS` jobs run concurrently.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use verify_engine::bootstrap;
use verify_engine::workflow::{Worker, WorkflowEngine};
use verify_engine::Settings;

#[derive(Parser, Debug)]
#[command(name = "worker", about = "Verification queue worker")]
struct Args {
    /// Override the concurrent job slots for this process
    #[arg(long)]
    max_workers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    bootstrap::init_logging(&settings);
    let args = Args::parse();

    let (deps, _store) = bootstrap::build_deps(&settings).await?;
    let queue = bootstrap::build_queue(&settings).await?;

    let engine = Arc::new(WorkflowEngine::new(deps, Arc::new(queue.clone())));
    let max_workers = args.max_workers.unwrap_or(settings.max_workers);
    let worker = Worker::new(queue, engine, max_workers);

    info!("Starting verification worker");
    worker.run().await
}
