use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{Mutex, Semaphore};

use crate::config::{AppConfig, StoreKind};
use crate::estimator::{CalorieEstimator, RandomEstimator};
use crate::ledger::{Ledger, LedgerStore};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<Mutex<Ledger>>,
    pub estimator: Arc<dyn CalorieEstimator>,
    /// One permit: at most one capture may be estimating at a time.
    pub capture_slot: Arc<Semaphore>,
}

impl AppState {
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = match config.store {
            StoreKind::File => Arc::new(
                FileStore::new(&config.data_dir)
                    .with_context(|| format!("open data dir {}", config.data_dir.display()))?,
            ),
            StoreKind::Memory => {
                tracing::warn!("using in-memory store; meals are lost on exit");
                Arc::new(MemoryStore::new())
            }
        };
        let estimator = Arc::new(RandomEstimator::new(config.estimator_delay));
        Ok(Self::from_parts(Arc::new(config), store, estimator))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn KeyValueStore>,
        estimator: Arc<dyn CalorieEstimator>,
    ) -> Self {
        let ledger = Ledger::open(LedgerStore::new(store));
        Self {
            config,
            ledger: Arc::new(Mutex::new(ledger)),
            estimator,
            capture_slot: Arc::new(Semaphore::new(1)),
        }
    }

    #[cfg(test)]
    pub fn fake(estimator: crate::estimator::FixedEstimator) -> Self {
        Self::fake_with_store(Arc::new(MemoryStore::new()), estimator)
    }

    #[cfg(test)]
    pub fn fake_with_store(
        store: Arc<dyn KeyValueStore>,
        estimator: crate::estimator::FixedEstimator,
    ) -> Self {
        use std::time::Duration;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreKind::Memory,
            data_dir: "unused".into(),
            estimator_delay: Duration::ZERO,
            estimate_timeout: Duration::from_secs(5),
            utc_offset: time::UtcOffset::UTC,
        });
        Self::from_parts(config, store, Arc::new(estimator))
    }
}
