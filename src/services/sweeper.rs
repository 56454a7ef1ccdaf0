//! Overdue sweeper: recurring reconciliation of the loan ledger
//!
//! Force-returns every loan past its due date on a fixed interval. The
//! sweep is idempotent, and the first tick fires immediately so loans that
//! went overdue while the server was down are reconciled at startup.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{error::AppResult, repository::Repository};

#[derive(Clone)]
pub struct OverdueSweeper {
    repository: Repository,
    interval: Duration,
}

impl OverdueSweeper {
    pub fn new(repository: Repository, interval: Duration) -> Self {
        Self {
            repository,
            interval,
        }
    }

    /// Run a single sweep and report how many loans were closed
    pub async fn run_once(&self) -> AppResult<u64> {
        let now = Utc::now();
        let swept = self.repository.loans.sweep_overdue(now).await?;

        if swept > 0 {
            tracing::info!(swept, "auto-returned overdue loans");
        } else {
            tracing::debug!("overdue sweep found nothing to return");
        }

        Ok(swept)
    }

    /// Spawn the recurring sweep task and hand back its lifecycle handle
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            tracing::error!(error = %e, "overdue sweep failed, retrying next tick");
                        }
                    }
                }
            }

            tracing::debug!("overdue sweeper stopped");
        });

        SweeperHandle {
            shutdown_tx,
            handle,
        }
    }
}

/// Handle to a running sweeper task
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the task to stop and wait for it to wind down
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
