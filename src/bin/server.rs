//! HTTP façade binary
//!
//! Serves the verification API. All workflow execution happens in the
//! worker binary; this process only validates, persists, and enqueues.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use verify_engine::api::{create_router, AppState};
use verify_engine::bootstrap;
use verify_engine::workflow::VerificationSubmitter;
use verify_engine::Settings;

#[derive(Parser, Debug)]
#[command(name = "server", about = "Verification API server")]
struct Args {
    /// Address to bind
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    bootstrap::init_logging(&settings);
    let args = Args::parse();

    let (deps, store) = bootstrap::build_deps(&settings).await?;
    let queue = bootstrap::build_queue(&settings).await?;
    let submitter = Arc::new(VerificationSubmitter::new(
        deps.clone(),
        Arc::new(queue.clone()),
    ));

    let state = AppState {
        store: deps.store.clone(),
        auth: Arc::new(store),
        submitter,
        queue,
        secret_key: settings.secret_key.clone(),
        token_ttl_minutes: settings.access_token_expire_minutes,
    };

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;

    info!("Verification API listening on {}", args.bind);
    axum::serve(listener, app).await.context("Server exited")?;
    Ok(())
}
