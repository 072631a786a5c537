//! Background worker that periodically refits the recommendation engine.
//!
//! Each tick runs a full fit with the configured lookback window. A failed
//! or superseded fit is logged and the previously published index keeps
//! serving until the next tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::recommend::{EngineError, Recommender};

/// Configuration for the refresh worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Time between refits
    pub refresh_interval: Duration,
    /// Fit once immediately on startup
    pub fit_on_start: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(3600),
            fit_on_start: true,
        }
    }
}

/// Handle for controlling the worker
pub struct WorkerHandle {
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Signal shutdown and wait for the task to exit
    pub async fn stop(self) {
        self.shutdown();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Refresh worker exited abnormally");
        }
    }
}

async fn refit(engine: &Recommender) {
    match engine.fit(None).await {
        Ok(report) => info!(
            generation = report.generation,
            outcome = ?report.outcome,
            items = report.num_items,
            "Scheduled refresh complete"
        ),
        Err(e @ EngineError::Superseded { .. }) => {
            warn!(error = %e, "Scheduled refresh superseded by a newer fit");
        }
        Err(e) => error!(error = %e, "Scheduled refresh failed"),
    }
}

/// Spawn the background refresh task
pub fn spawn_refresh_worker(engine: Arc<Recommender>, config: WorkerConfig) -> WorkerHandle {
    let (shutdown_tx, mut rx) = tokio::sync::watch::channel(false);

    let task = tokio::spawn(async move {
        info!(
            interval_s = config.refresh_interval.as_secs(),
            "Refresh worker started"
        );

        if config.fit_on_start {
            refit(&engine).await;
        }

        loop {
            if *rx.borrow() {
                info!("Refresh worker received shutdown signal");
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(config.refresh_interval) => {
                    refit(&engine).await;
                }
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        info!("Refresh worker received shutdown signal during sleep");
                        break;
                    }
                }
            }
        }

        info!("Refresh worker stopped");
    });

    WorkerHandle { shutdown_tx, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::{EngineSettings, FitState};
    use crate::storage::MemoryStore;
    use crate::types::InteractionEvent;

    fn engine() -> Arc<Recommender> {
        let now = chrono::Utc::now().timestamp();
        let store = Arc::new(MemoryStore::with_data(
            vec![
                InteractionEvent::new("u1", "v1", "view", now),
                InteractionEvent::new("u1", "v2", "view", now),
            ],
            Vec::new(),
        ));
        Arc::new(Recommender::new(store.clone(), store, EngineSettings::default()))
    }

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(3600));
        assert!(config.fit_on_start);
    }

    #[tokio::test]
    async fn test_worker_fits_on_start() {
        let engine = engine();
        let handle = spawn_refresh_worker(engine.clone(), WorkerConfig::default());

        let mut fitted = false;
        for _ in 0..100 {
            if engine.status().await.state == FitState::Fitted {
                fitted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.stop().await;
        assert!(fitted);
    }

    #[tokio::test]
    async fn test_worker_stops_promptly() {
        let engine = engine();
        let handle = spawn_refresh_worker(
            engine.clone(),
            WorkerConfig {
                refresh_interval: Duration::from_secs(3600),
                fit_on_start: false,
            },
        );

        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .unwrap();
        assert_eq!(engine.status().await.state, FitState::Unfit);
    }
}
