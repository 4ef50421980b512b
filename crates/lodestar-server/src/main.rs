//! Lodestar server: thin HTTP surface over the planning layer.
//!
//! Vocabulary mutations return as soon as the document is stored; extraction
//! and path recalculation run on a background job, so a path query may
//! transiently reflect the prior vocabulary state until the job completes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lodestar_index::{IndexStore, MemoryStore};
use lodestar_paths::{PathConfig, Planner};

mod http;
mod jobs;

#[derive(Parser)]
#[command(name = "lodestar")]
#[command(author, version, about = "Linked-data crawl planning service")]
struct Cli {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8000")]
    listen: SocketAddr,

    /// Index snapshot file. Omit for a purely in-memory index.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Worker pool size for extraction and enumeration fan-outs.
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Cap on enumerated elementary cycles per recalculation.
    #[arg(long, default_value_t = 4096)]
    max_cycles: usize,

    /// Backward-walk recursion bound.
    #[arg(long, default_value_t = 64)]
    max_depth: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let store = match cli.snapshot.as_ref() {
        Some(path) => Arc::new(MemoryStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let config = PathConfig {
        workers: cli.workers,
        max_cycles: cli.max_cycles,
        max_depth: cli.max_depth,
    };
    let planner = Arc::new(Planner::new(
        store.clone() as Arc<dyn IndexStore>,
        config,
    )?);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to start runtime: {e}"))?;
    rt.block_on(async move {
        let jobs = jobs::spawn_worker(planner.clone(), store.clone());
        let state = Arc::new(http::ServerState { planner, jobs });

        tokio::select! {
            result = http::serve(cli.listen, state) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                if let Err(e) = store.save() {
                    warn!(error = %e, "failed to save index snapshot on shutdown");
                }
                Ok(())
            }
        }
    })
}
