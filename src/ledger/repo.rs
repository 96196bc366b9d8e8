use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{LoadError, PersistenceError};
use crate::ledger::repo_types::{MealRecord, Snapshot};
use crate::storage::KeyValueStore;

/// Store key holding the whole serialized ledger.
pub const LEDGER_KEY: &str = "ai-meal-tracker-meals";

/// Result of a mutating ledger call.
///
/// `snapshot` is the new authoritative view whether or not the write landed.
#[derive(Debug)]
pub struct Update {
    pub snapshot: Snapshot,
    pub persisted: Result<(), PersistenceError>,
}

/// Serializes the full ledger into a single key of a [`KeyValueStore`].
#[derive(Clone)]
pub struct LedgerStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl LedgerStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, LEDGER_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Reads the persisted ledger. Anything unusable yields an empty snapshot.
    pub fn load(&self) -> Snapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => {
                info!(key = %self.key, meals = snapshot.len(), "ledger loaded");
                snapshot
            }
            Ok(None) => {
                debug!(key = %self.key, "no persisted ledger; starting empty");
                Snapshot::empty()
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "persisted ledger unusable; starting empty");
                Snapshot::empty()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Snapshot>, LoadError> {
        let raw = self.store.get(&self.key).map_err(|source| LoadError::Read {
            key: self.key.clone(),
            source,
        })?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let records: Vec<MealRecord> = serde_json::from_str(&raw)?;
        Ok(Some(Snapshot::from(records)))
    }

    /// Prepends `record` to `current` and persists the result.
    pub fn add(&self, record: MealRecord, current: &Snapshot) -> Update {
        let snapshot = current.prepend(record);
        let persisted = self.save(&snapshot);
        Update {
            snapshot,
            persisted,
        }
    }

    /// Drops every record and persists the empty ledger.
    pub fn clear(&self, current: &Snapshot) -> Update {
        debug!(key = %self.key, discarded = current.len(), "clearing ledger");
        let snapshot = Snapshot::empty();
        let persisted = self.save(&snapshot);
        Update {
            snapshot,
            persisted,
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(snapshot)?;
        self.store
            .set(&self.key, &raw)
            .map_err(|source| PersistenceError::Write {
                key: self.key.clone(),
                source,
            })?;
        Ok(())
    }
}

/// Owns the current snapshot. All mutation goes through `record` and `clear`.
pub struct Ledger {
    store: LedgerStore,
    current: Snapshot,
}

impl Ledger {
    pub fn open(store: LedgerStore) -> Self {
        let current = store.load();
        Self { store, current }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current.clone()
    }

    pub fn record(&mut self, record: MealRecord) -> Update {
        let update = self.store.add(record, &self.current);
        self.adopt(&update);
        update
    }

    pub fn clear(&mut self) -> Update {
        let update = self.store.clear(&self.current);
        self.adopt(&update);
        update
    }

    fn adopt(&mut self, update: &Update) {
        if let Err(e) = &update.persisted {
            warn!(error = %e, meals = update.snapshot.len(), "ledger not persisted; keeping in-memory snapshot");
        }
        self.current = update.snapshot.clone();
    }
}
