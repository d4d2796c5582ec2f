// src/state.rs
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::cache::BroadcastInvalidator;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::error::StartupError;
use crate::policy::AlwaysOpen;
use crate::service::PollService;
use crate::store::{MemoryPollStore, PgPollStore, PollStore};

#[derive(Clone)]
pub struct AppState {
    pub service: PollService,
    invalidations: BroadcastInvalidator,
}

impl AppState {
    pub fn with_store(store: Arc<dyn PollStore>) -> Self {
        let invalidations = BroadcastInvalidator::default();
        let service = PollService::new(store, Arc::new(invalidations.clone()), Arc::new(AlwaysOpen));
        Self {
            service,
            invalidations,
        }
    }

    /// Stale cache keys for the presentation layer, in the order they were emitted.
    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<String> {
        self.invalidations.subscribe()
    }

    pub async fn from_config(config: &Config) -> Result<Self, StartupError> {
        let store: Arc<dyn PollStore> = match &config.database {
            Some(database) => {
                info!(?database, "Connecting to Postgres");
                let pool = create_pool(database).await?;
                run_migrations(&pool).await?;
                Arc::new(PgPollStore::new(pool))
            }
            None => Arc::new(MemoryPollStore::new()),
        };

        Ok(Self::with_store(store))
    }
}
