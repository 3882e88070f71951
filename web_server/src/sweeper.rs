use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::instrument;

use crate::app_settings::RetentionConfig;
use crate::remote::{RemoteStore, RemoteStoreError};

/// Periodically removes remote groupings older than the retention
/// threshold. Runs as its own task, fully decoupled from request
/// handling; the threshold comfortably exceeds any single request's
/// duration, so it never races an in-flight publish.
pub struct RetentionSweeper {
    store: Arc<dyn RemoteStore>,
    parent_folder_id: String,
    max_age: chrono::Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        retention: &RetentionConfig,
        parent_folder_id: String,
    ) -> Self {
        Self {
            store,
            parent_folder_id,
            max_age: chrono::Duration::seconds(retention.max_age_secs),
            interval: Duration::from_secs(retention.sweep_interval_secs),
        }
    }

    /// Sweep loop. A failed sweep is logged and the loop keeps going;
    /// the next tick gets another chance.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(deleted) if deleted > 0 => {
                    tracing::info!("Retention sweep done. deleted={deleted}");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::error!("Retention sweep failed. error={error}");
                }
            }
        }
    }

    /// One pass over the parent container. A listing failure aborts the
    /// sweep; a delete failure for one grouping is logged and the loop
    /// moves on to the next one.
    #[instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<usize, RemoteStoreError> {
        let folders = self.store.list_folders(&self.parent_folder_id).await?;
        let cutoff = Utc::now() - self.max_age;

        let mut deleted = 0;
        for folder in folders {
            if folder.created_at >= cutoff {
                continue;
            }
            match self.store.delete_folder(&folder.id).await {
                Ok(()) => {
                    tracing::info!(
                        "Removed expired grouping. folder={} created_at={}",
                        folder.name,
                        folder.created_at
                    );
                    deleted += 1;
                }
                Err(error) => {
                    tracing::error!(
                        "Failed to remove expired grouping. folder={} error={error}",
                        folder.name
                    );
                }
            }
        }

        Ok(deleted)
    }
}
