//! Background analysis jobs.
//!
//! One worker task drains the queue in order: vocabulary mutations enqueue
//! here and return to the client immediately. A failed job leaves the prior
//! walk/cycle catalogue authoritative; the error is logged and the queue
//! keeps going.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use lodestar_index::MemoryStore;
use lodestar_paths::Planner;

#[derive(Debug, Clone)]
pub enum Job {
    /// Extract a vocabulary and rebuild the catalogue.
    Analyse(String),
    /// Scrub a removed vocabulary (cascading seeds) and rebuild.
    Purge(String),
}

pub fn spawn_worker(
    planner: Arc<Planner>,
    store: Arc<MemoryStore>,
) -> mpsc::UnboundedSender<Job> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let planner = planner.clone();
            let label = format!("{job:?}");
            let result = tokio::task::spawn_blocking(move || match job {
                Job::Analyse(vid) => planner.analyse(&vid),
                Job::Purge(vid) => planner.purge_vocabulary(&vid),
            })
            .await;

            match result {
                Ok(Ok(summary)) => {
                    info!(job = %label, cycles = summary.cycles, walks = summary.walks, "analysis done");
                    if let Err(e) = store.save() {
                        warn!(error = %e, "failed to save index snapshot");
                    }
                }
                Ok(Err(e)) => warn!(job = %label, error = %e, "analysis failed; prior catalogue stays authoritative"),
                Err(e) => warn!(job = %label, error = %e, "analysis task panicked"),
            }
        }
    });
    tx
}
